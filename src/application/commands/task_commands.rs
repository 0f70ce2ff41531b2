//! Task Commands

use crate::domain::task::TaskId;

/// 创建任务：保存原文并按断句标准切分
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub content: String,
    /// 断句标准编号，缺省使用配置的默认标准
    pub standard_id: Option<u8>,
    pub char_count: Option<usize>,
}

/// 删除任务及其全部句子、规则、合并任务与音频
#[derive(Debug, Clone)]
pub struct DeleteTask {
    pub task_id: TaskId,
}
