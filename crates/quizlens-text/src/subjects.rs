// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Subject and question-type rule tables.
//
// Every table is ordered data; the classifier walks them front to back.
// Terms made only of ASCII letters match as whole words, case-insensitively;
// everything else matches as a substring.

use quizlens_core::{QuestionType, Subject};

// -- Subject scoring ------------------------------------------------------------

pub const KEYWORD_WEIGHT: f64 = 1.0;
pub const SYMBOL_WEIGHT: f64 = 1.5;
pub const PATTERN_WEIGHT: f64 = 3.0;
pub const EXCLUSIVE_WEIGHT: f64 = 5.0;
pub const CONTEXT_WEIGHT: f64 = 0.5;

/// Below this best score the coarse fallback heuristics decide.
pub const SUBJECT_THRESHOLD: f64 = 2.0;

/// Evidence for one subject. Each entry scores once when present.
#[derive(Debug)]
pub struct SubjectProfile {
    pub subject: Subject,
    pub keywords: &'static [&'static str],
    pub symbols: &'static [&'static str],
    /// Regular expressions.
    pub patterns: &'static [&'static str],
    /// Features that practically only occur in this subject.
    pub exclusive: &'static [&'static str],
    pub context: &'static [&'static str],
}

pub const SUBJECT_PROFILES: &[SubjectProfile] = &[
    SubjectProfile {
        subject: Subject::Math,
        keywords: &[
            "函数", "方程", "不等式", "集合", "数列", "向量", "三角形", "概率", "导数", "直线",
            "抛物线", "椭圆", "双曲线", "坐标", "实数", "整数", "解集", "sin", "cos", "tan", "log",
        ],
        symbols: &["∠", "△", "≌", "∽", "⊥", "∥", "√", "π", "∞", "≤", "≥", "∈", "∉", "⊆", "∪", "∩"],
        patterns: &[
            r"f\s*\(\s*x\s*\)",
            r"[a-z]\s*\^\s*\d|[a-z][²³]",
            r"\d+\s*[+\-×÷]\s*\d+\s*=",
            r"(?:sin|cos|tan)\s*[A-Za-zα-ω0-9(∠]",
        ],
        exclusive: &["定义域", "值域", "等差数列", "等比数列", "lim", "∫", "∑"],
        context: &["求", "计算", "已知", "设", "则"],
    },
    SubjectProfile {
        subject: Subject::Physics,
        keywords: &[
            "速度", "加速度", "质量", "电流", "电压", "电阻", "能量", "功率", "摩擦", "磁场",
            "电场", "波长", "频率", "重力", "压强", "浮力", "动能", "势能",
        ],
        symbols: &["m/s", "Ω", "Hz", "kW", "km/h", "kg"],
        patterns: &[
            r"\d+(?:\.\d+)?\s*(?:N|J|W|V|Pa|Ω)(?:$|[^A-Za-z])",
            r"[Ff]\s*=\s*m\s*a",
            r"[Vv]\s*=\s*[Ss]\s*/\s*[Tt]",
        ],
        exclusive: &["牛顿第", "欧姆定律", "电磁感应", "m/s²", "焦耳"],
        context: &["物体", "小球", "木块", "斜面", "实验"],
    },
    SubjectProfile {
        subject: Subject::Chemistry,
        keywords: &[
            "化学", "反应", "元素", "化合物", "溶液", "氧化", "还原", "离子", "分子", "原子",
            "摩尔", "催化剂", "沉淀", "电解",
        ],
        symbols: &["↑", "↓", "⇌", "mol"],
        patterns: &[r"[A-Z][a-z]?[₂₃₄2-4](?:[A-Z][a-z]?[₂₃₄2-4]?)*", r"\d*\s*mol(?:/L)?", r"pH\s*[=<>]"],
        exclusive: &["mol/L", "化学方程式", "元素周期", "氧化还原", "⇌", "NaOH", "H₂SO₄", "H2SO4"],
        context: &["加热", "溶于", "生成", "实验"],
    },
    SubjectProfile {
        subject: Subject::Biology,
        keywords: &[
            "细胞", "基因", "DNA", "RNA", "蛋白质", "遗传", "染色体", "酶", "生态", "种群",
            "进化", "激素", "神经",
        ],
        symbols: &["♀", "♂"],
        patterns: &[r"(?:AA|Aa|aa)(?:BB|Bb|bb)?\s*[×x]\s*(?:AA|Aa|aa)"],
        exclusive: &["光合作用", "呼吸作用", "减数分裂", "有丝分裂", "基因型", "表现型"],
        context: &["观察", "生物", "实验"],
    },
    SubjectProfile {
        subject: Subject::Chinese,
        keywords: &[
            "阅读", "文章", "作者", "诗", "古文", "修辞", "段落", "句子", "成语", "拼音", "词语",
            "赏析",
        ],
        symbols: &["《", "》"],
        patterns: &[r"《[^》]+》", r"[之乎者也矣焉哉兮][，。！？]"],
        exclusive: &["文言文", "古诗", "修辞手法", "中心思想", "思想感情"],
        context: &["理解", "体会", "分析"],
    },
    SubjectProfile {
        subject: Subject::English,
        keywords: &[
            "the", "is", "are", "what", "which", "passage", "sentence", "word", "grammar",
            "choose", "read", "write",
        ],
        symbols: &[],
        patterns: &[r"[A-Za-z]+(?:[\s,']+[A-Za-z]+){5,}"],
        exclusive: &["read the following", "choose the best", "fill in the blank", "完形填空", "语法填空"],
        context: &["英语", "English", "翻译"],
    },
    SubjectProfile {
        subject: Subject::History,
        keywords: &[
            "朝代", "皇帝", "革命", "战争", "条约", "王朝", "改革", "变法", "秦朝", "汉朝",
            "唐朝", "宋朝", "明朝", "清朝", "历史", "古代",
        ],
        symbols: &[],
        patterns: &[r"公元前?\s*\d+\s*年", r"\d{3,4}\s*年", r"\d+\s*世纪"],
        exclusive: &["鸦片战争", "辛亥革命", "五四运动", "戊戌变法", "工业革命"],
        context: &["影响", "意义", "原因"],
    },
    SubjectProfile {
        subject: Subject::Geography,
        keywords: &[
            "气候", "地形", "河流", "经度", "纬度", "降水", "气温", "季风", "板块", "人口",
            "城市", "农业", "地图",
        ],
        symbols: &["°E", "°N", "°W", "°S"],
        patterns: &[r"\d+\s*°\s*[NSEW]", r"[东西]经\s*\d+", r"[南北]纬\s*\d+"],
        exclusive: &["等高线", "季风气候", "经纬网", "洋流", "比例尺"],
        context: &["地区", "分布", "位于"],
    },
    SubjectProfile {
        subject: Subject::Politics,
        keywords: &[
            "经济", "政治", "国家", "社会", "法律", "权利", "义务", "民主", "政府", "市场", "文化",
            "哲学", "矛盾",
        ],
        symbols: &[],
        patterns: &[r"社会主义\S*", r"马克思\S*"],
        exclusive: &["社会主义核心价值观", "人民代表大会", "唯物主义", "辩证法", "宪法"],
        context: &["意义", "体现", "说明"],
    },
];

// -- Question signals -------------------------------------------------------------

/// Words that mark text as a question prompt.
pub const QUESTION_WORDS: &[&str] = &[
    "下列", "正确", "错误", "求", "计算", "证明", "解释", "说明", "分析", "判断", "选择", "填空",
    "what", "which", "why", "how", "choose", "complete", "answer",
];

/// Phrases meaning more than one option may be correct.
pub const MULTI_ANSWER_INDICATORS: &[&str] = &[
    "多选",
    "不定项",
    "正确的有",
    "哪些",
    "两项",
    "which of the following are",
    "select all",
    "choose two",
    "all that apply",
];

/// Type indicators for questions without options, in priority order.
/// Cloze and grammar-fill come before fill-blank since they contain it.
pub const TYPE_INDICATORS: &[(QuestionType, &[&str])] = &[
    (QuestionType::Cloze, &["完形填空", "cloze"]),
    (QuestionType::GrammarFill, &["语法填空"]),
    (QuestionType::FillBlank, &["填空", "__"]),
    (QuestionType::Proof, &["证明", "求证", "prove"]),
    (QuestionType::Experiment, &["实验", "探究", "experiment"]),
    (QuestionType::Diagram, &["作图", "画出", "draw"]),
    (QuestionType::ReadingComprehension, &["阅读", "read the following", "passage"]),
    (QuestionType::Translation, &["翻译", "translate"]),
    (QuestionType::Composition, &["作文", "写一篇", "essay", "composition"]),
    (QuestionType::TrueFalse, &["判断", "对的打", "true or false"]),
    (QuestionType::ErrorCorrection, &["改错", "找出错误", "correct the mistakes"]),
    (QuestionType::Calculation, &["计算", "求值", "calculate"]),
    (QuestionType::ShortAnswer, &["简答", "简述", "简要回答", "说明理由"]),
];

/// Whether `term` occurs in `text`. `lowered` is `text` in lower case.
pub fn contains_term(text: &str, lowered: &str, term: &str) -> bool {
    if !term.bytes().all(|b| b.is_ascii_alphabetic()) {
        return text.contains(term) || lowered.contains(&term.to_lowercase());
    }
    let needle = term.to_ascii_lowercase();
    lowered.match_indices(&needle).any(|(at, _)| {
        let before = lowered[..at].chars().next_back();
        let after = lowered[at + needle.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphabetic()) && !after.is_some_and(|c| c.is_ascii_alphabetic())
    })
}
