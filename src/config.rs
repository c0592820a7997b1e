//! 配置模块，负责加载Filter关键字注册表

use crate::ast::ValueShape;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Filter注册表配置错误
#[derive(Debug, thiserror::Error)]
#[error("配置错误: {message}")]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

/// Filter所作用的对象类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterType {
    /// 卡牌库中的实体卡
    PhysicalCard,
    /// 卡组
    PhysicalCardSet,
}

/// 关键字接受的参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterArg {
    /// 不接受参数
    None,
    /// 自由文本
    Entry,
    /// 从 domain 中选取的值列表
    List { domain: Vec<String> },
    /// "values FROM from" 两侧列表
    ListFrom {
        domain: Vec<String>,
        from_domain: Vec<String>,
    },
}

/// 单个Filter关键字的定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDef {
    pub keyword: String,
    pub description: String,
    #[serde(default)]
    pub help_text: String,
    /// 关键字可用于哪些对象类型
    pub types: Vec<FilterType>,
    pub arg: FilterArg,
    /// 查询时对应的数据库列
    pub column: String,
    /// "from" 一侧对应的数据库列
    #[serde(default)]
    pub from_column: Option<String>,
}

impl FilterDef {
    /// 解析器交给box model的参数形状
    pub fn value_shape(&self) -> ValueShape {
        match &self.arg {
            FilterArg::None => ValueShape::Literal,
            FilterArg::Entry => ValueShape::Entry,
            FilterArg::List { domain } => ValueShape::List { domain: domain.clone() },
            FilterArg::ListFrom { domain, from_domain } => ValueShape::Tuple {
                domain: domain.clone(),
                from_domain: from_domain.clone(),
            },
        }
    }

    pub fn applies_to(&self, filter_type: FilterType) -> bool {
        self.types.contains(&filter_type)
    }
}

/// Filter注册表配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRegistry {
    /// 对象类型到数据库表名的映射
    #[serde(default)]
    pub tables: HashMap<FilterType, String>,
    pub filters: Vec<FilterDef>,
}

impl FilterRegistry {
    /// 从JSON文件加载Filter注册表
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::new(format!(
                "配置文件不存在: {}",
                path_ref.display()
            )));
        }

        // 读取文件内容
        let content = fs::read_to_string(path_ref).map_err(|e| {
            ConfigError::new(format!("无法读取配置文件 {}: {}", path_ref.display(), e))
        })?;

        // 解析JSON
        let registry: FilterRegistry = serde_json::from_str(&content).map_err(|e| {
            ConfigError::new(format!("无法解析JSON配置文件 {}: {}", path_ref.display(), e))
        })?;

        registry.validate()?;
        log::debug!(
            "loaded {} filter definitions from {}",
            registry.filters.len(),
            path_ref.display()
        );
        Ok(registry)
    }

    /// 检查关键字是否重复，以及 "from" 关键字是否配置了 from_column
    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for def in &self.filters {
            if !seen.insert(def.keyword.to_ascii_lowercase()) {
                return Err(ConfigError::new(format!("重复的Filter关键字: {}", def.keyword)));
            }
            if matches!(def.arg, FilterArg::ListFrom { .. }) && def.from_column.is_none() {
                return Err(ConfigError::new(format!(
                    "Filter关键字 {} 缺少 from_column",
                    def.keyword
                )));
            }
        }
        Ok(())
    }

    /// 按关键字查找定义，不区分大小写
    pub fn get(&self, keyword: &str) -> Option<&FilterDef> {
        self.filters
            .iter()
            .find(|def| def.keyword.eq_ignore_ascii_case(keyword))
    }

    /// 获取某个对象类型可用的全部Filter
    pub fn filters_for_type(&self, filter_type: FilterType) -> Vec<&FilterDef> {
        self.filters
            .iter()
            .filter(|def| def.applies_to(filter_type))
            .collect()
    }

    /// 获取对象类型对应的表名，如果不存在则返回默认表名
    pub fn get_table_name(&self, filter_type: FilterType) -> String {
        self.tables
            .get(&filter_type)
            .cloned()
            .unwrap_or_else(|| match filter_type {
                FilterType::PhysicalCard => "physical_card".to_string(),
                FilterType::PhysicalCardSet => "physical_card_set".to_string(),
            })
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn def(
    keyword: &str,
    description: &str,
    help_text: &str,
    types: &[FilterType],
    arg: FilterArg,
    column: &str,
) -> FilterDef {
    FilterDef {
        keyword: keyword.to_string(),
        description: description.to_string(),
        help_text: help_text.to_string(),
        types: types.to_vec(),
        arg,
        column: column.to_string(),
        from_column: None,
    }
}

impl Default for FilterRegistry {
    /// 内置的卡牌Filter（用于测试或fallback）
    fn default() -> Self {
        use FilterType::{PhysicalCard, PhysicalCardSet};

        let clans = strings(&[
            "Assamite", "Brujah", "Followers of Set", "Gangrel", "Giovanni", "Lasombra",
            "Malkavian", "Nosferatu", "Ravnos", "Toreador", "Tremere", "Tzimisce", "Ventrue",
        ]);
        let disciplines = strings(&[
            "Animalism", "Auspex", "Celerity", "Chimerstry", "Dementation", "Dominate",
            "Fortitude", "Necromancy", "Obfuscate", "Potence", "Presence", "Protean",
            "Quietus", "Serpentis", "Thaumaturgy", "Vicissitude",
        ]);
        let card_types = strings(&[
            "Action", "Action Modifier", "Ally", "Combat", "Conviction", "Equipment",
            "Event", "Imbued", "Master", "Political Action", "Power", "Reaction",
            "Retainer", "Vampire",
        ]);

        let mut card_count = def(
            "CardCount",
            "Card Count",
            "Cards with the given number of copies in the given card sets. \
             -1 matches any count, an empty card set matches all sets.",
            &[PhysicalCard],
            FilterArg::ListFrom {
                domain: strings(&["1", "2", "3", "4", "5", "-1"]),
                from_domain: Vec::new(),
            },
            "card_count",
        );
        card_count.from_column = Some("card_set_name".to_string());

        let filters = vec![
            def(
                "CardType",
                "Card Type",
                "Cards of the given types.",
                &[PhysicalCard, PhysicalCardSet],
                FilterArg::List { domain: card_types },
                "card_type",
            ),
            def(
                "Clan",
                "Clan",
                "Cards requiring or belonging to the given clans.",
                &[PhysicalCard, PhysicalCardSet],
                FilterArg::List { domain: clans },
                "clan",
            ),
            def(
                "Discipline",
                "Discipline",
                "Cards requiring or granting the given disciplines.",
                &[PhysicalCard, PhysicalCardSet],
                FilterArg::List { domain: disciplines },
                "discipline",
            ),
            def(
                "Sect",
                "Sect",
                "Crypt cards of the given sects.",
                &[PhysicalCard, PhysicalCardSet],
                FilterArg::List {
                    domain: strings(&["Anarch", "Camarilla", "Independent", "Laibon", "Sabbat"]),
                },
                "sect",
            ),
            def(
                "CardText",
                "Card Text",
                "Cards whose text contains the given string.",
                &[PhysicalCard, PhysicalCardSet],
                FilterArg::Entry,
                "card_text",
            ),
            def(
                "CardName",
                "Card Name",
                "Cards whose name contains the given string.",
                &[PhysicalCard, PhysicalCardSet],
                FilterArg::Entry,
                "card_name",
            ),
            def(
                "Unique",
                "Unique",
                "Unique cards.",
                &[PhysicalCard, PhysicalCardSet],
                FilterArg::None,
                "is_unique",
            ),
            card_count,
            def(
                "CardSetName",
                "Card Set Name",
                "Card sets whose name contains the given string.",
                &[PhysicalCardSet],
                FilterArg::Entry,
                "name",
            ),
            def(
                "CardSetInUse",
                "Card Set In Use",
                "Card sets marked as in use.",
                &[PhysicalCardSet],
                FilterArg::None,
                "in_use",
            ),
        ];

        let mut tables = HashMap::new();
        tables.insert(PhysicalCard, "physical_card".to_string());
        tables.insert(PhysicalCardSet, "physical_card_set".to_string());

        Self { tables, filters }
    }
}
