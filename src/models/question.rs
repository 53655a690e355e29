use serde::{Deserialize, Serialize};

/// 每道题最多的选项数量（A-E）
pub const MAX_ANSWERS: usize = 5;

/// 选项字母表
pub const LETTERS: [char; MAX_ANSWERS] = ['A', 'B', 'C', 'D', 'E'];

/// 按位置取选项字母（0 -> 'A'）
pub fn letter_for(index: usize) -> Option<char> {
    LETTERS.get(index).copied()
}

/// 字母转位置，大小写不敏感（'c' -> 2）
pub fn index_of(letter: char) -> Option<usize> {
    let upper = letter.to_ascii_uppercase();
    LETTERS.iter().position(|&l| l == upper)
}

/// 规范化一个字母，只接受 A-E
pub fn normalize_letter(letter: char) -> Option<char> {
    index_of(letter).and_then(letter_for)
}

/// 清理文本：去掉首尾空白，内部空白压缩为一个空格
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 单个选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub letter: char,
    pub text: String,
}

/// 题目来源信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    pub source_file: String,
    /// 文本中检测到、但被答案表覆盖或无法映射的字母
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_answer: Option<char>,
}

/// 标准化后的题目记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: u32,
    #[serde(alias = "questionText")]
    pub question: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub answers: Vec<AnswerOption>,
    #[serde(default)]
    pub correct_answer: Option<char>,
    #[serde(default)]
    pub provenance: Provenance,
}

impl QuestionRecord {
    /// 所有选项文本拼接（用于分类）
    pub fn answers_text(&self) -> String {
        self.answers
            .iter()
            .map(|a| a.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// 是否已经有可用的正确答案
    pub fn has_resolved_answer(&self) -> bool {
        self.correct_answer
            .and_then(index_of)
            .map(|idx| idx < self.answers.len())
            .unwrap_or(false)
    }

    /// 检查记录是否满足不变量：1-5 个选项，字母从 A 连续递增，题干非空
    pub fn is_well_formed(&self) -> bool {
        if self.question.trim().is_empty() {
            return false;
        }
        if self.answers.is_empty() || self.answers.len() > MAX_ANSWERS {
            return false;
        }
        self.answers
            .iter()
            .enumerate()
            .all(|(i, a)| letter_for(i) == Some(a.letter))
    }
}

impl std::fmt::Display for QuestionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let preview = if self.question.chars().count() > 80 {
            self.question.chars().take(80).collect::<String>() + "..."
        } else {
            self.question.clone()
        };
        match self.correct_answer {
            Some(letter) => write!(f, "#{} {} [答案: {}]", self.id, preview, letter),
            None => write!(f, "#{} {} [答案: 未知]", self.id, preview),
        }
    }
}
