use crate::config::AiConfig;

pub const DEFAULT_AUTO_PROMPT: &str = "你是一个专业的网文商业分析师。请阅读以上小说开篇内容（前5章），分析并以纯 JSON 格式返回以下信息（不要使用 Markdown 代码块）：\n{\n  \"genre\": \"题材类型 (如：玄幻/系统/都市文)\",\n  \"style\": \"整体风格 (如：轻松搞笑/热血/暗黑)\",\n  \"goldfinger\": \"金手指设定 (简要概括主角的特殊能力或系统)\",\n  \"opening\": \"开篇故事梗概 (100字以内)\",\n  \"highlights\": \"核心看点与爽点分析 (50字以内)\"\n}";

pub const DEFAULT_CHAPTER_PROMPT: &str = "你是一个拥有10年经验的网文主编，擅长拆解爆款小说的底层逻辑。\n请将用户提供的这一章小说内容，反向还原为【细纲/章纲】。\n\n要求：\n1. 必须严格按照原文的叙事顺序，将内容拆解为关键情节节点。\n2. 每个节点必须包含两个部分：\n   - 【剧情概括】：用简练的语言概括发生了什么（Who Did What）。\n   - 【写作目的】：深度分析作者写这一段的意图（例如：制造冲突、拉高期待、压抑情绪、制造危机、展示金手指、打脸爽点、埋下伏笔、转换地图等）。\n\n请使用以下格式输出：\n\n### 1. [剧情节点]\n> **概括**: ...\n> **目的**: (例如：制造冲突) ...\n\n### 2. [剧情节点]\n...\n\n### 💡 本章核心总结\n(一句话概括本章主旨)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisKind {
    /// Whole-novel summary from the opening chapters, answered as JSON
    Auto,
    /// Plot-beat outline of a single chapter, answered as Markdown
    Chapter,
}

impl AnalysisKind {
    pub fn wants_json(self) -> bool {
        matches!(self, Self::Auto)
    }

    pub fn default_prompt(self) -> &'static str {
        match self {
            Self::Auto => DEFAULT_AUTO_PROMPT,
            Self::Chapter => DEFAULT_CHAPTER_PROMPT,
        }
    }
}

/// The configured prompt for `kind`, or the built-in one when unset.
pub fn resolve_prompt(kind: AnalysisKind, config: &AiConfig) -> String {
    let configured = match kind {
        AnalysisKind::Auto => config.configured_auto_prompt(),
        AnalysisKind::Chapter => config.configured_chapter_prompt(),
    };
    configured.unwrap_or(kind.default_prompt()).to_string()
}
