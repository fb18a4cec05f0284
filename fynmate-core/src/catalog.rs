//! Closed category and payment-method enumerations.
//!
//! The same table drives the extractor's instruction template and the coercion
//! of whatever the language service sends back, so the two cannot drift apart.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Expense categories a transaction can be filed under
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Food,
    Transport,
    Entertainment,
    Shopping,
    Bills,
    Donation,
    SelfCare,
    #[default]
    Other,
}

/// How a transaction was paid
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PaymentMethod {
    Cash,
    Ovo,
    GoPay,
    Dana,
    ShopeePay,
    CreditCard,
    Bca,
    Mandiri,
    Jago,
    #[default]
    Other,
}

/// One row of the catalog: the member, its display label, and extra spellings
/// accepted on input.
pub struct Entry<T: 'static> {
    pub value: T,
    pub label: &'static str,
    pub aliases: &'static [&'static str],
}

pub const CATEGORIES: &[Entry<Category>] = &[
    Entry {
        value: Category::Food,
        label: "Food",
        aliases: &["makanan", "makan", "minuman", "kuliner", "food & drink", "f&b"],
    },
    Entry {
        value: Category::Transport,
        label: "Transport",
        aliases: &["transportasi", "transportation", "bensin", "parkir", "ojol"],
    },
    Entry {
        value: Category::Entertainment,
        label: "Entertainment",
        aliases: &["hiburan", "leisure"],
    },
    Entry {
        value: Category::Shopping,
        label: "Shopping",
        aliases: &["belanja", "belanjaan"],
    },
    Entry {
        value: Category::Bills,
        label: "Bills",
        aliases: &["tagihan", "bill", "utilities"],
    },
    Entry {
        value: Category::Donation,
        label: "Donation",
        aliases: &["Amal/Donasi/Zakat", "amal", "donasi", "zakat", "sedekah", "infaq", "charity"],
    },
    Entry {
        value: Category::SelfCare,
        label: "Self Care",
        aliases: &["selfcare", "perawatan", "kesehatan", "health"],
    },
    Entry {
        value: Category::Other,
        label: "Other",
        aliases: &["lainnya", "lain-lain", "misc"],
    },
];

pub const PAYMENT_METHODS: &[Entry<PaymentMethod>] = &[
    Entry {
        value: PaymentMethod::Cash,
        label: "Cash",
        aliases: &["tunai", "uang tunai", "cash money"],
    },
    Entry {
        value: PaymentMethod::Ovo,
        label: "OVO",
        aliases: &[],
    },
    Entry {
        value: PaymentMethod::GoPay,
        label: "GoPay",
        aliases: &["go-pay", "gopey"],
    },
    Entry {
        value: PaymentMethod::Dana,
        label: "Dana",
        aliases: &[],
    },
    Entry {
        value: PaymentMethod::ShopeePay,
        label: "ShopeePay",
        aliases: &["spay", "shopee"],
    },
    Entry {
        value: PaymentMethod::CreditCard,
        label: "Credit Card",
        aliases: &["cc", "kartu kredit", "kredit"],
    },
    Entry {
        value: PaymentMethod::Bca,
        label: "BCA",
        aliases: &["klikbca", "mbca", "bca mobile"],
    },
    Entry {
        value: PaymentMethod::Mandiri,
        label: "Mandiri",
        aliases: &["livin", "livin mandiri"],
    },
    Entry {
        value: PaymentMethod::Jago,
        label: "Jago",
        aliases: &["bank jago"],
    },
    Entry {
        value: PaymentMethod::Other,
        label: "Other",
        aliases: &["lainnya"],
    },
];

/// Lowercased alphanumerics only, so "Self-Care", "self care" and "SELFCARE" compare equal.
fn match_key(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn lookup<T: Copy>(table: &[Entry<T>], raw: &str) -> Option<T> {
    let key = match_key(raw);
    if key.is_empty() {
        return None;
    }
    table
        .iter()
        .find(|e| match_key(e.label) == key || e.aliases.iter().any(|a| match_key(a) == key))
        .map(|e| e.value)
}

fn label_of<T: Copy + PartialEq>(table: &[Entry<T>], value: T) -> &'static str {
    table
        .iter()
        .find(|e| e.value == value)
        .map(|e| e.label)
        .unwrap_or("Other")
}

/// Labels in catalog order, joined for prompt text.
pub fn labels<T>(table: &[Entry<T>]) -> Vec<&'static str> {
    table.iter().map(|e| e.label).collect()
}

impl Category {
    /// Exact catalog match (label or alias), `None` when unknown.
    pub fn lookup(raw: &str) -> Option<Self> {
        lookup(CATEGORIES, raw)
    }

    /// Resolve any input to a member; unknown or empty input becomes `Other`.
    pub fn coerce(raw: &str) -> Self {
        Self::lookup(raw).unwrap_or(Category::Other)
    }

    pub fn label(&self) -> &'static str {
        label_of(CATEGORIES, *self)
    }
}

impl PaymentMethod {
    pub fn lookup(raw: &str) -> Option<Self> {
        lookup(PAYMENT_METHODS, raw)
    }

    pub fn coerce(raw: &str) -> Self {
        Self::lookup(raw).unwrap_or(PaymentMethod::Other)
    }

    pub fn label(&self) -> &'static str {
        label_of(PAYMENT_METHODS, *self)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

// Wire format is the display label; anything unrecognized on input is coerced
// to `Other` rather than rejected.

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Category::coerce(&raw))
    }
}

impl Serialize for PaymentMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for PaymentMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(PaymentMethod::coerce(&raw))
    }
}
