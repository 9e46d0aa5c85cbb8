//! 语言标签页管理
//! 每个管理器维护有序的语言标签页，每个标签页维护有序的服务器行

use crate::languages::{language_name, ServerNamer};
use crate::types::{DownloadKind, DownloadServer, VideoServer, VideoSourceKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// 标签页所属的列表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabKind {
    Video,
    Download,
}

impl TabKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TabKind::Video => "video",
            TabKind::Download => "download",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TabError {
    #[error("标签页不存在: {0}")]
    UnknownTab(String),
    #[error("标签页 {tab} 中不存在第 {index} 行服务器")]
    RowOutOfRange { tab: String, index: usize },
    #[error("服务器行格式错误: {0}")]
    InvalidRow(String),
}

/// 标签页中的一行服务器
pub trait ServerRow: Clone {
    fn name(&self) -> &str;
    fn set_name(&mut self, name: String);
    /// 空白行 (只有名称)
    fn blank(name: String) -> Self;
}

/// 播放服务器行
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRow {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub kind: VideoSourceKind,
}

impl VideoRow {
    pub fn to_server(&self) -> VideoServer {
        VideoServer::new(self.name.clone(), self.url.clone(), self.kind)
    }
}

impl From<&VideoServer> for VideoRow {
    fn from(server: &VideoServer) -> Self {
        VideoRow {
            name: server.name.clone(),
            url: server.url.clone(),
            kind: server.kind(),
        }
    }
}

impl ServerRow for VideoRow {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn blank(name: String) -> Self {
        VideoRow {
            name,
            ..Default::default()
        }
    }
}

impl ServerRow for DownloadServer {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: String) {
        self.name = name;
    }

    fn blank(name: String) -> Self {
        DownloadServer {
            name,
            url: String::new(),
            kind: DownloadKind::External,
        }
    }
}

/// 一个语言标签页
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTab<R> {
    pub id: String,
    pub lang: String,
    pub servers: Vec<R>,
}

/// 标签页管理器
#[derive(Debug, Clone)]
pub struct TabManager<R> {
    kind: TabKind,
    tabs: Vec<LanguageTab<R>>,
    active: Option<String>,
    lang_counter: usize,
}

impl<R: ServerRow> TabManager<R> {
    pub fn new(kind: TabKind) -> Self {
        Self {
            kind,
            tabs: Vec::new(),
            active: None,
            lang_counter: 0,
        }
    }

    pub fn tabs(&self) -> &[LanguageTab<R>] {
        &self.tabs
    }

    pub fn active_tab(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn tab(&self, tab_id: &str) -> Result<&LanguageTab<R>, TabError> {
        self.tabs
            .iter()
            .find(|t| t.id == tab_id)
            .ok_or_else(|| TabError::UnknownTab(tab_id.to_string()))
    }

    fn tab_mut(&mut self, tab_id: &str) -> Result<&mut LanguageTab<R>, TabError> {
        self.tabs
            .iter_mut()
            .find(|t| t.id == tab_id)
            .ok_or_else(|| TabError::UnknownTab(tab_id.to_string()))
    }

    /// 添加标签页并激活，没有给出服务器时放一行空白服务器
    pub fn add_tab(&mut self, lang: &str, servers: Vec<R>, namer: &mut ServerNamer) -> String {
        self.lang_counter += 1;
        let id = format!("{}-lang-{}", self.kind.as_str(), self.lang_counter);

        let mut tab = LanguageTab {
            id: id.clone(),
            lang: lang.trim().to_string(),
            servers: Vec::with_capacity(servers.len().max(1)),
        };
        if servers.is_empty() {
            tab.servers.push(R::blank(namer.default_name(0)));
        } else {
            for row in servers {
                push_row(&mut tab.servers, row, namer);
            }
        }

        debug!("添加{}标签页 {} ({})", self.kind.as_str(), id, tab.lang);
        self.tabs.push(tab);
        self.active = Some(id.clone());
        id
    }

    pub fn activate(&mut self, tab_id: &str) -> Result<(), TabError> {
        self.tab(tab_id)?;
        self.active = Some(tab_id.to_string());
        Ok(())
    }

    /// 删除标签页；若删除的是当前标签页，依次激活前一个、后一个
    pub fn delete_tab(&mut self, tab_id: &str) -> Result<LanguageTab<R>, TabError> {
        let pos = self
            .tabs
            .iter()
            .position(|t| t.id == tab_id)
            .ok_or_else(|| TabError::UnknownTab(tab_id.to_string()))?;
        let removed = self.tabs.remove(pos);

        if self.active.as_deref() == Some(tab_id) {
            let neighbour = if pos > 0 {
                self.tabs.get(pos - 1)
            } else {
                self.tabs.get(pos)
            };
            self.active = neighbour.map(|t| t.id.clone());
        }

        debug!("删除{}标签页 {}", self.kind.as_str(), tab_id);
        Ok(removed)
    }

    pub fn set_language(&mut self, tab_id: &str, lang: &str) -> Result<(), TabError> {
        self.tab_mut(tab_id)?.lang = lang.trim().to_string();
        Ok(())
    }

    /// 追加一行服务器，返回新行的下标
    pub fn add_server(
        &mut self,
        tab_id: &str,
        row: Option<R>,
        namer: &mut ServerNamer,
    ) -> Result<usize, TabError> {
        let tab = self.tab_mut(tab_id)?;
        let row = match row {
            Some(row) => row,
            None => R::blank(String::new()),
        };
        push_row(&mut tab.servers, row, namer);
        Ok(tab.servers.len() - 1)
    }

    pub fn update_server(&mut self, tab_id: &str, index: usize, row: R) -> Result<(), TabError> {
        let tab = self.tab_mut(tab_id)?;
        let slot = tab
            .servers
            .get_mut(index)
            .ok_or_else(|| TabError::RowOutOfRange {
                tab: tab_id.to_string(),
                index,
            })?;
        *slot = row;
        Ok(())
    }

    /// 删除一行，后面的行下标前移
    pub fn remove_server(&mut self, tab_id: &str, index: usize) -> Result<R, TabError> {
        let tab = self.tab_mut(tab_id)?;
        if index >= tab.servers.len() {
            return Err(TabError::RowOutOfRange {
                tab: tab_id.to_string(),
                index,
            });
        }
        Ok(tab.servers.remove(index))
    }

    /// 清空所有标签页并重置编号
    pub fn clear(&mut self) {
        self.tabs.clear();
        self.active = None;
        self.lang_counter = 0;
    }
}

impl<R: ServerRow + Serialize> TabManager<R> {
    /// 生成供前端渲染的快照
    pub fn render(&self) -> TabsView<'_, R> {
        TabsView {
            kind: self.kind,
            active: self.active_tab(),
            tabs: self
                .tabs
                .iter()
                .map(|tab| TabView {
                    id: &tab.id,
                    lang: &tab.lang,
                    language_name: language_name(&tab.lang),
                    active: self.active_tab() == Some(tab.id.as_str()),
                    servers: tab
                        .servers
                        .iter()
                        .enumerate()
                        .map(|(index, row)| RowView { index, row })
                        .collect(),
                })
                .collect(),
        }
    }
}

fn push_row<R: ServerRow>(rows: &mut Vec<R>, mut row: R, namer: &mut ServerNamer) {
    if row.name().trim().is_empty() {
        row.set_name(namer.default_name(rows.len()));
    }
    rows.push(row);
}

#[derive(Debug, Serialize)]
pub struct TabsView<'a, R> {
    pub kind: TabKind,
    pub active: Option<&'a str>,
    pub tabs: Vec<TabView<'a, R>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabView<'a, R> {
    pub id: &'a str,
    pub lang: &'a str,
    pub language_name: Option<&'static str>,
    pub active: bool,
    pub servers: Vec<RowView<'a, R>>,
}

#[derive(Debug, Serialize)]
pub struct RowView<'a, R> {
    pub index: usize,
    #[serde(flatten)]
    pub row: &'a R,
}
