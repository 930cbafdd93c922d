//! Subject-matter domain registry.
//!
//! Domains are a closed set known at compile time. Each variant carries a
//! static [`DomainDefinition`] with its keywords, preferred model tier,
//! retrieval collections, and system prompt.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Cost/capability tier of a model. Concrete model ids come from
/// [`ModelsConfig`](crate::domain::models::ModelsConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Cheapest, fastest tier. Greetings and quick lookups.
    Light,
    /// General-purpose tier.
    Standard,
    /// Large model for complex multi-step work.
    Heavy,
    /// Most capable tier, reserved for expert requests.
    Expert,
}

/// Static description of a domain.
#[derive(Debug, Clone, Copy)]
pub struct DomainDefinition {
    pub keywords: &'static [&'static str],
    pub model: ModelTier,
    pub rag_collections: &'static [&'static str],
    pub system_prompt: &'static str,
    pub needs_escalation: bool,
}

/// A registered subject-matter domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Construction,
    Finance,
    Legal,
    Software,
    General,
}

const CONSTRUCTION: DomainDefinition = DomainDefinition {
    keywords: &[
        "鋼筋", "混凝土", "施工", "工地", "模板", "鷹架", "營造", "建築", "樑柱", "基礎開挖",
        "rebar", "concrete", "construction", "scaffold", "formwork", "building code",
    ],
    model: ModelTier::Standard,
    rag_collections: &["construction_specs", "construction_cases"],
    system_prompt: "You are a senior construction engineer. Answer with attention to \
        specifications, building codes, material quantities and site safety. Always state units.",
    needs_escalation: false,
};

const FINANCE: DomainDefinition = DomainDefinition {
    keywords: &[
        "財務", "預算", "報價", "成本", "發票", "會計", "現金流", "稅務",
        "budget", "invoice", "accounting", "cash flow", "tax", "cost estimate", "quotation",
    ],
    model: ModelTier::Standard,
    rag_collections: &["finance_docs"],
    system_prompt: "You are a careful financial analyst. Show your calculations, keep \
        currencies explicit, and flag any assumption that affects the totals.",
    needs_escalation: false,
};

const LEGAL: DomainDefinition = DomainDefinition {
    keywords: &[
        "法律", "合約", "契約", "條款", "訴訟", "違約", "法規", "律師", "賠償",
        "contract", "lawsuit", "liability", "clause", "legal", "breach", "regulation",
    ],
    model: ModelTier::Heavy,
    rag_collections: &["legal_statutes", "legal_cases"],
    system_prompt: "You are a legal research assistant. Cite the statute or clause you rely \
        on, separate facts from interpretation, and note when a licensed lawyer should be consulted.",
    needs_escalation: true,
};

const SOFTWARE: DomainDefinition = DomainDefinition {
    keywords: &[
        "程式", "資料庫", "伺服器", "除錯", "部署",
        "source code", "python", "javascript", "typescript", "compile", "debug", "sql", "stack trace",
    ],
    model: ModelTier::Standard,
    rag_collections: &["software_docs"],
    system_prompt: "You are an experienced software engineer. Prefer working code over prose, \
        explain trade-offs briefly, and point out edge cases.",
    needs_escalation: false,
};

const GENERAL: DomainDefinition = DomainDefinition {
    keywords: &[],
    model: ModelTier::Standard,
    rag_collections: &["general"],
    system_prompt: "You are a knowledgeable, concise assistant. Reply in the language the user writes in.",
    needs_escalation: false,
};

impl Domain {
    /// Every specific (non-general) domain, ordered by id.
    pub const fn all() -> &'static [Domain] {
        &[Domain::Construction, Domain::Finance, Domain::Legal, Domain::Software]
    }

    pub const fn id(self) -> &'static str {
        match self {
            Self::Construction => "construction",
            Self::Finance => "finance",
            Self::Legal => "legal",
            Self::Software => "software",
            Self::General => "general",
        }
    }

    pub const fn definition(self) -> &'static DomainDefinition {
        match self {
            Self::Construction => &CONSTRUCTION,
            Self::Finance => &FINANCE,
            Self::Legal => &LEGAL,
            Self::Software => &SOFTWARE,
            Self::General => &GENERAL,
        }
    }

    pub const fn is_general(self) -> bool {
        matches!(self, Self::General)
    }

    /// Every collection id referenced by any domain, general included.
    pub fn known_collections() -> Vec<&'static str> {
        let mut collections: Vec<&'static str> = Self::all()
            .iter()
            .chain(std::iter::once(&Self::General))
            .flat_map(|d| d.definition().rag_collections.iter().copied())
            .collect();
        collections.sort_unstable();
        collections.dedup();
        collections
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Domain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().to_lowercase();
        Self::all()
            .iter()
            .chain(std::iter::once(&Self::General))
            .find(|d| d.id() == id)
            .copied()
            .ok_or_else(|| DomainError::UnknownDomain(s.to_string()))
    }
}
