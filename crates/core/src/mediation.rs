use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::Transcript;

/// Closed safety taxonomy. A and B are safe to answer autonomously;
/// C must always terminate on the human handoff path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskCategory {
    #[serde(rename = "A")]
    Information,
    #[serde(rename = "B")]
    Logistics,
    #[serde(rename = "C")]
    NegotiationLegal,
}

impl RiskCategory {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Information => "A",
            Self::Logistics => "B",
            Self::NegotiationLegal => "C",
        }
    }

    /// Category→agent table, kept as data so adding an agent means adding
    /// one entry here rather than editing conditionals at call sites.
    pub fn allowed_routes(&self) -> &'static [RouteTarget] {
        match self {
            Self::Information => &[
                RouteTarget::Search,
                RouteTarget::Transaction,
                RouteTarget::Document,
                RouteTarget::Renovation,
                RouteTarget::GeneralChat,
            ],
            Self::Logistics => &[RouteTarget::Viewing],
            Self::NegotiationLegal => &[RouteTarget::Handoff],
        }
    }
}

impl std::str::FromStr for RiskCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Self::Information),
            "B" => Ok(Self::Logistics),
            "C" => Ok(Self::NegotiationLegal),
            other => Err(format!("unknown risk category `{other}` (expected A|B|C)")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTarget {
    Search,
    Viewing,
    Transaction,
    Document,
    Renovation,
    GeneralChat,
    Handoff,
}

impl RouteTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Viewing => "viewing",
            Self::Transaction => "transaction",
            Self::Document => "document",
            Self::Renovation => "renovation",
            Self::GeneralChat => "general_chat",
            Self::Handoff => "handoff",
        }
    }
}

impl std::str::FromStr for RouteTarget {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "search" => Ok(Self::Search),
            "viewing" => Ok(Self::Viewing),
            "transaction" => Ok(Self::Transaction),
            "document" => Ok(Self::Document),
            "renovation" => Ok(Self::Renovation),
            "general_chat" => Ok(Self::GeneralChat),
            "handoff" => Ok(Self::Handoff),
            other => Err(format!("unknown route target `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: RiskCategory,
    pub routing: RouteTarget,
    pub rationale: String,
}

impl Classification {
    /// Category C maps to handoff unconditionally. The routing the
    /// underlying classifier proposed is a suggestion everywhere else, but
    /// never here.
    pub fn enforced_routing(&self) -> RouteTarget {
        if self.category == RiskCategory::NegotiationLegal {
            RouteTarget::Handoff
        } else {
            self.routing
        }
    }

    pub fn is_route_permitted(&self) -> bool {
        self.category.allowed_routes().contains(&self.routing)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("classifier call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
    #[error("classifier produced malformed output: {0}")]
    MalformedOutput(String),
}

/// The safety-boundary gate. Implementations must fail with a
/// `ClassifierError` rather than guessing; the dispatcher fails the turn
/// closed when no classification can be produced.
#[async_trait]
pub trait MediationClassifier: Send + Sync {
    async fn classify(&self, transcript: &Transcript) -> Result<Classification, ClassifierError>;
}

struct MarkerSet {
    words: &'static [&'static str],
    phrases: &'static [&'static str],
}

impl MarkerSet {
    fn matched(&self, tokens: &[String], normalized: &str) -> Option<&'static str> {
        if let Some(word) =
            self.words.iter().copied().find(|word| tokens.iter().any(|token| token == word))
        {
            return Some(word);
        }
        self.phrases.iter().find(|phrase| normalized.contains(*phrase)).copied()
    }
}

const NEGOTIATION_MARKERS: MarkerSet = MarkerSet {
    words: &[
        "negotiate",
        "negotiation",
        "negotiating",
        "discount",
        "haggle",
        "clause",
        "clauses",
        "interpret",
        "interpretation",
        "validity",
        "liability",
    ],
    phrases: &[
        "lower the price",
        "price down",
        "knock off",
        "legal",
        "contract terms",
        "交渉",
        "値引き",
        "値下げ",
        "違法",
        "法的",
        "契約条件",
        "条項",
    ],
};

const DOCUMENT_MARKERS: MarkerSet = MarkerSet {
    words: &["analyze", "analyse", "document", "documents", "pdf", "ocr"],
    phrases: &["重要事項", "登記簿", "書類", "契約書"],
};

const TRANSACTION_MARKERS: MarkerSet = MarkerSet {
    words: &[
        "offer",
        "mortgage",
        "loan",
        "purchase",
        "buy",
        "buying",
        "contract",
        "registration",
        "preapproval",
    ],
    phrases: &["pre-approval", "住宅ローン", "購入", "登記", "申し込み"],
};

const VIEWING_MARKERS: MarkerSet = MarkerSet {
    words: &["viewing", "view", "visit", "book", "booking", "tour", "tours"],
    phrases: &["内見", "見学", "内覧"],
};

const RENOVATION_MARKERS: MarkerSet = MarkerSet {
    words: &["renovate", "renovation", "remodel", "remodeling", "refurbish", "fix", "repair"],
    phrases: &["リフォーム", "リノベーション", "修繕"],
};

const SEARCH_MARKERS: MarkerSet = MarkerSet {
    words: &[
        "search",
        "find",
        "apartment",
        "apartments",
        "condo",
        "condominium",
        "mansion",
        "listing",
        "listings",
    ],
    phrases: &["looking for", "物件", "探して", "マンション"],
};

fn tokenize(normalized: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(normalized.len());
    for character in normalized.chars() {
        if character.is_alphanumeric() {
            sanitized.push(character);
        } else {
            sanitized.push(' ');
        }
    }
    sanitized.split_whitespace().map(|token| token.to_string()).collect()
}

/// Deterministic keyword implementation of the mediation contract. The
/// category/route decision follows the intent taxonomy; negotiation-of-terms
/// language always wins, even when transaction intent is also present.
#[derive(Clone, Debug, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }

    pub fn classify_text(&self, text: &str) -> Classification {
        let normalized = text.to_lowercase();
        let tokens = tokenize(&normalized);

        if let Some(marker) = NEGOTIATION_MARKERS.matched(&tokens, &normalized) {
            return Classification {
                category: RiskCategory::NegotiationLegal,
                routing: RouteTarget::Handoff,
                rationale: format!("matched negotiation/legal marker `{marker}`"),
            };
        }
        if let Some(marker) = DOCUMENT_MARKERS.matched(&tokens, &normalized) {
            return Classification {
                category: RiskCategory::Information,
                routing: RouteTarget::Document,
                rationale: format!("matched document marker `{marker}`"),
            };
        }
        if let Some(marker) = TRANSACTION_MARKERS.matched(&tokens, &normalized) {
            return Classification {
                category: RiskCategory::Information,
                routing: RouteTarget::Transaction,
                rationale: format!("matched transaction marker `{marker}`"),
            };
        }
        if let Some(marker) = VIEWING_MARKERS.matched(&tokens, &normalized) {
            return Classification {
                category: RiskCategory::Logistics,
                routing: RouteTarget::Viewing,
                rationale: format!("matched viewing marker `{marker}`"),
            };
        }
        if let Some(marker) = RENOVATION_MARKERS.matched(&tokens, &normalized) {
            return Classification {
                category: RiskCategory::Information,
                routing: RouteTarget::Renovation,
                rationale: format!("matched renovation marker `{marker}`"),
            };
        }
        if let Some(marker) = SEARCH_MARKERS.matched(&tokens, &normalized) {
            return Classification {
                category: RiskCategory::Information,
                routing: RouteTarget::Search,
                rationale: format!("matched search marker `{marker}`"),
            };
        }
        if tokens.iter().any(|token| token.ends_with("ldk")) {
            return Classification {
                category: RiskCategory::Information,
                routing: RouteTarget::Search,
                rationale: "matched floor-plan shorthand".to_string(),
            };
        }

        Classification {
            category: RiskCategory::Information,
            routing: RouteTarget::GeneralChat,
            rationale: "no intent markers matched".to_string(),
        }
    }
}

#[async_trait]
impl MediationClassifier for KeywordClassifier {
    async fn classify(&self, transcript: &Transcript) -> Result<Classification, ClassifierError> {
        let Some(latest) = transcript.last_user_message() else {
            return Ok(Classification {
                category: RiskCategory::Information,
                routing: RouteTarget::GeneralChat,
                rationale: "empty transcript".to_string(),
            });
        };
        Ok(self.classify_text(latest))
    }
}
