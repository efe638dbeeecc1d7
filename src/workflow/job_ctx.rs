//! 任务处理上下文
//!
//! 封装"我正在处理第几个任务"这一信息，只用于日志和事件

use std::fmt::Display;

/// 任务处理上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobCtx {
    /// 在本次提交中的序号（从 1 开始）
    pub index: usize,

    /// 本次提交的任务总数
    pub total: usize,

    /// 表格行号（直接提交的任务为 None）
    pub row: Option<usize>,
}

impl JobCtx {
    /// 批处理中的一行
    pub fn new(index: usize, total: usize, row: Option<usize>) -> Self {
        Self { index, total, row }
    }

    /// 直接提交的单个任务
    pub fn single() -> Self {
        Self::new(1, 1, None)
    }
}

impl Display for JobCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.row {
            Some(row) => write!(f, "[任务 {}/{} 第{}行]", self.index, self.total, row),
            None => write!(f, "[任务 {}/{}]", self.index, self.total),
        }
    }
}
