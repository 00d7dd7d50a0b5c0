//! The fifteen questionnaire indicators.
//!
//! Variant order is the column order the classifier was trained on and must
//! never change. Every indicator carries its wording in each supported
//! [`Locale`]: a model column name, a question and one label per code value.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of indicators in one feature vector.
pub const FEATURE_COUNT: usize = 15;

/// Display language for labels, advice and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Zh,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en-gb" | "english" => Ok(Locale::En),
            "zh" | "zh-cn" | "zh-hans" | "chinese" => Ok(Locale::Zh),
            other => Err(format!("unsupported locale '{other}' (expected 'en' or 'zh')")),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::En => f.write_str("en"),
            Locale::Zh => f.write_str("zh"),
        }
    }
}

/// One binary questionnaire item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    HardFood,
    SleepDuration,
    PsychologicalCounseling,
    Handrail,
    Polypharmacy,
    SafetyWarning,
    Hospitalization,
    EconomicStatus,
    Phq,
    Exercise,
    AceScore,
    Education,
    FitnessArea,
    ChildhoodHealth,
    ChildhoodEconomy,
}

struct Wording {
    column: &'static str,
    question: &'static str,
    options: [&'static str; 2],
}

const KEYS: [&str; FEATURE_COUNT] = [
    "hard_food",
    "sleep_duration",
    "psychological_counseling",
    "handrail",
    "polypharmacy",
    "safety_warning",
    "hospitalization",
    "economic_status",
    "phq",
    "exercise",
    "ace_score",
    "education",
    "fitness_area",
    "childhood_health",
    "childhood_economy",
];

const EN: [Wording; FEATURE_COUNT] = [
    Wording {
        column: "Hard food",
        question: "Eating hard food",
        options: ["No difficulty", "Has difficulty"],
    },
    Wording {
        column: "Sleep duration",
        question: "Sleep duration",
        options: ["Normal", "Abnormal"],
    },
    Wording {
        column: "Psychological counseling",
        question: "Receiving psychological counseling",
        options: ["No", "Yes"],
    },
    Wording {
        column: "Handrail",
        question: "Bathroom handrail installed",
        options: ["Absent", "Present"],
    },
    Wording {
        column: "Polypharmacy",
        question: "Taking multiple medications",
        options: ["No", "Yes"],
    },
    Wording {
        column: "Safety warning",
        question: "Safety-warning risk",
        options: ["No", "Yes"],
    },
    Wording {
        column: "Hospitalization",
        question: "History of hospitalization",
        options: ["No", "Yes"],
    },
    Wording {
        column: "Economic status",
        question: "Economic status",
        options: ["Impoverished", "Not impoverished"],
    },
    Wording {
        column: "PHQ",
        question: "PHQ depression screening result",
        options: ["Negative", "Positive"],
    },
    Wording {
        column: "Exercise",
        question: "Physical exercise",
        options: ["None", "Present"],
    },
    Wording {
        column: "ACE score",
        question: "Adverse childhood experience (ACE) score",
        options: ["No", "Yes"],
    },
    Wording {
        column: "Education",
        question: "Education level",
        options: ["Elementary or below", "Middle school or above"],
    },
    Wording {
        column: "Fitness area",
        question: "Access to a fitness area",
        options: ["Absent", "Present"],
    },
    Wording {
        column: "Childhood health",
        question: "Childhood health",
        options: ["Not poor", "Poor"],
    },
    Wording {
        column: "Childhood economy",
        question: "Childhood economic status",
        options: ["Not impoverished", "Impoverished"],
    },
];

const ZH: [Wording; FEATURE_COUNT] = [
    Wording {
        column: "硬的食物",
        question: "硬的食物食用情况",
        options: ["完全没问题", "有问题"],
    },
    Wording {
        column: "睡眠时长",
        question: "睡眠时长",
        options: ["正常", "异常"],
    },
    Wording {
        column: "心理咨询",
        question: "是否接受心理咨询",
        options: ["否", "是"],
    },
    Wording {
        column: "洗手扶手",
        question: "是否有洗手扶手",
        options: ["无", "有"],
    },
    Wording {
        column: "多药",
        question: "是否服用多种药物",
        options: ["否", "是"],
    },
    Wording {
        column: "安全警示",
        question: "是否有安全警示风险",
        options: ["否", "是"],
    },
    Wording {
        column: "是否住院",
        question: "是否有住院史",
        options: ["否", "是"],
    },
    Wording {
        column: "经济",
        question: "经济状况",
        options: ["贫困", "非贫困"],
    },
    Wording {
        column: "PHQ",
        question: "PHQ量表评估结果",
        options: ["否", "是"],
    },
    Wording {
        column: "锻炼次数",
        question: "是否有体育锻炼",
        options: ["无", "有"],
    },
    Wording {
        column: "ACEzong",
        question: "ACEzong评估结果",
        options: ["否", "是"],
    },
    Wording {
        column: "教育程度",
        question: "教育程度",
        options: ["小学及以下", "初中及以上"],
    },
    Wording {
        column: "健身区",
        question: "是否有健身区",
        options: ["无", "有"],
    },
    Wording {
        column: "童年健康",
        question: "童年健康状况",
        options: ["不差", "差"],
    },
    Wording {
        column: "童年经济",
        question: "童年经济状况",
        options: ["非贫困", "贫困"],
    },
];

impl Indicator {
    /// All indicators in training column order.
    pub const ALL: [Indicator; FEATURE_COUNT] = [
        Indicator::HardFood,
        Indicator::SleepDuration,
        Indicator::PsychologicalCounseling,
        Indicator::Handrail,
        Indicator::Polypharmacy,
        Indicator::SafetyWarning,
        Indicator::Hospitalization,
        Indicator::EconomicStatus,
        Indicator::Phq,
        Indicator::Exercise,
        Indicator::AceScore,
        Indicator::Education,
        Indicator::FitnessArea,
        Indicator::ChildhoodHealth,
        Indicator::ChildhoodEconomy,
    ];

    /// Column position in the feature vector.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Indicator> {
        Self::ALL.get(index).copied()
    }

    /// Stable machine key used in form field names and JSON payloads.
    pub fn key(self) -> &'static str {
        KEYS[self.index()]
    }

    pub fn from_key(key: &str) -> Option<Indicator> {
        KEYS.iter()
            .position(|k| *k == key)
            .and_then(Self::from_index)
    }

    /// Column name shown in explanations.
    pub fn column_name(self, locale: Locale) -> &'static str {
        wording(self, locale).column
    }

    pub fn question(self, locale: Locale) -> &'static str {
        wording(self, locale).question
    }

    /// Display label for a code value. Codes other than 0 and 1 have no label.
    pub fn option_label(self, code: u8, locale: Locale) -> Option<&'static str> {
        wording(self, locale).options.get(code as usize).copied()
    }

    /// Column names for every indicator, in training order.
    pub fn column_names(locale: Locale) -> Vec<&'static str> {
        Self::ALL.iter().map(|i| i.column_name(locale)).collect()
    }

    /// Resolve a column name in any locale back to its indicator.
    pub fn from_column_name(name: &str) -> Option<Indicator> {
        let name = name.trim();
        Self::ALL.iter().copied().find(|i| {
            i.column_name(Locale::En) == name || i.column_name(Locale::Zh) == name || i.key() == name
        })
    }
}

fn wording(indicator: Indicator, locale: Locale) -> &'static Wording {
    match locale {
        Locale::En => &EN[indicator.index()],
        Locale::Zh => &ZH[indicator.index()],
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_index() {
        for (i, ind) in Indicator::ALL.iter().enumerate() {
            assert_eq!(ind.index(), i);
            assert_eq!(Indicator::from_key(ind.key()), Some(*ind));
        }
        assert_eq!(Indicator::from_key("age"), None);
    }

    #[test]
    fn training_order_starts_with_hard_food_and_ends_with_childhood_economy() {
        assert_eq!(Indicator::ALL[0], Indicator::HardFood);
        assert_eq!(Indicator::ALL[8], Indicator::Phq);
        assert_eq!(Indicator::ALL[14], Indicator::ChildhoodEconomy);
    }

    #[test]
    fn option_labels_follow_code_meaning() {
        assert_eq!(
            Indicator::EconomicStatus.option_label(0, Locale::En),
            Some("Impoverished")
        );
        assert_eq!(
            Indicator::ChildhoodEconomy.option_label(1, Locale::En),
            Some("Impoverished")
        );
        assert_eq!(Indicator::HardFood.option_label(0, Locale::Zh), Some("完全没问题"));
        assert_eq!(Indicator::HardFood.option_label(2, Locale::Zh), None);
    }

    #[test]
    fn chinese_column_names_match_training_header() {
        let names = Indicator::column_names(Locale::Zh);
        assert_eq!(names.len(), FEATURE_COUNT);
        assert_eq!(names[0], "硬的食物");
        assert_eq!(names[10], "ACEzong");
        assert_eq!(Indicator::from_column_name("童年经济"), Some(Indicator::ChildhoodEconomy));
        assert_eq!(Indicator::from_column_name("PHQ"), Some(Indicator::Phq));
    }

    #[test]
    fn locale_parses_common_spellings() {
        assert_eq!("EN".parse::<Locale>().unwrap(), Locale::En);
        assert_eq!("zh-CN".parse::<Locale>().unwrap(), Locale::Zh);
        assert!("fr".parse::<Locale>().is_err());
    }
}
