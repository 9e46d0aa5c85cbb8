//! 语言代码表与默认服务器名称

/// 可选的语言 (代码, 显示名称)
pub const LANGUAGES: &[(&str, &str)] = &[
    ("es", "Español"),
    ("es-MX", "Español (Latino)"),
    ("es-ES", "Español (España)"),
    ("en", "Inglés"),
    ("ja", "Japonés"),
    ("ja-sub", "Japonés (Subtitulado)"),
    ("pt-BR", "Portugués (Brasil)"),
    ("fr", "Francés"),
    ("it", "Italiano"),
    ("de", "Alemán"),
    ("ko", "Coreano"),
    ("zh", "Chino"),
];

/// 空标签页中第一行服务器的默认名称
pub const PRIMARY_SERVER_NAME: &str = "Yamilat (Principal)";

/// 其余服务器的轮换名称
pub const SERVER_NAMES: &[&str] = &[
    "Zeus", "Hera", "Poseidón", "Deméter", "Atenea", "Apolo", "Artemisa", "Ares", "Afrodita",
    "Hefesto", "Hermes", "Dioniso", "Odín", "Thor", "Loki", "Freya", "Ra", "Anubis", "Isis",
    "Osiris", "Amaterasu", "Susanoo", "Tsukuyomi", "Quetzalcóatl",
];

/// 根据代码查找显示名称
pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// 轮换取名器，每个编辑会话一个
#[derive(Debug, Clone, Default)]
pub struct ServerNamer {
    counter: usize,
}

impl ServerNamer {
    pub fn next_name(&mut self) -> String {
        let name = SERVER_NAMES[self.counter % SERVER_NAMES.len()];
        self.counter += 1;
        name.to_string()
    }

    /// 空列表的第一行用主名称，不消耗轮换计数
    pub fn default_name(&mut self, existing_rows: usize) -> String {
        if existing_rows == 0 {
            PRIMARY_SERVER_NAME.to_string()
        } else {
            self.next_name()
        }
    }
}
