//! 消息模板 - 命名的 `{placeholder}` 占位符
//!
//! `{{` 和 `}}` 输出字面大括号。格式说明 (`{x:.1f}`) 和转换 (`{x!r}`)
//! 会报错，不会被静默忽略。

use std::collections::BTreeMap;
use thiserror::Error;

/// 模板可用的命名值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateContext {
    values: BTreeMap<String, String>,
}

impl TemplateContext {
    /// 创建空上下文
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入值（builder 风格）
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.insert(key, value);
        self
    }

    /// 插入值
    pub fn insert(&mut self, key: impl Into<String>, value: impl ToString) {
        self.values.insert(key.into(), value.to_string());
    }

    /// 查找值
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 模板渲染错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown placeholder `{0}`")]
    UnknownPlaceholder(String),
    #[error("unclosed `{{` at byte {0}")]
    UnclosedBrace(usize),
    #[error("single `}}` at byte {0}")]
    StrayClosingBrace(usize),
    #[error("format spec not supported in `{{{0}}}`")]
    UnsupportedSpec(String),
}

/// 用 `context` 替换 `template` 中的所有占位符
pub fn render(template: &str, context: &TemplateContext) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        match ch {
            '{' => {
                if matches!(chars.peek(), Some((_, '{'))) {
                    chars.next();
                    out.push('{');
                    continue;
                }

                let mut field = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    field.push(c);
                }
                if !closed {
                    return Err(TemplateError::UnclosedBrace(idx));
                }
                if field.contains([':', '!']) {
                    return Err(TemplateError::UnsupportedSpec(field));
                }

                let key = field.trim();
                let value = context
                    .get(key)
                    .ok_or_else(|| TemplateError::UnknownPlaceholder(key.to_string()))?;
                out.push_str(value);
            }
            '}' => {
                if matches!(chars.peek(), Some((_, '}'))) {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(TemplateError::StrayClosingBrace(idx));
                }
            }
            c => out.push(c),
        }
    }

    Ok(out)
}
