/// What the classifier thinks a credit is. Set once at ingestion, credits
/// only; debits keep `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestedKind {
    Unknown,
    Paycheck,
    Windfall,
    InternalTransfer,
    Refund,
}

impl SuggestedKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Paycheck => "paycheck",
            Self::Windfall => "windfall",
            Self::InternalTransfer => "internal_transfer",
            Self::Refund => "refund",
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code {
            "paycheck" => Self::Paycheck,
            "windfall" => Self::Windfall,
            "internal_transfer" => Self::InternalTransfer,
            "refund" => Self::Refund,
            _ => Self::Unknown,
        }
    }
}

/// How the user decided a deposit should affect the dynamic balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepositDecision {
    TreatAsIncome,
    IgnoreForDynamic,
    DebtPayment,
    SavingsFunded,
}

impl DepositDecision {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TreatAsIncome => "treat_as_income",
            Self::IgnoreForDynamic => "ignore_for_dynamic",
            Self::DebtPayment => "debt_payment",
            Self::SavingsFunded => "savings_funded",
        }
    }

}

/// How the user disposed of a flagged large expense.
#[derive(Debug, Clone, PartialEq)]
pub enum LargeExpenseDecision {
    /// Leave it as normal spending; the hit to this period stands.
    TreatAsVariableSpend,
    /// It really came from savings; refund this period's balance.
    FromSavings,
    /// Convert to an installment plan: refund this period, bill future ones.
    ToFixedCost {
        periods: Option<u32>,
        per_period_amount: Option<f64>,
        name: Option<String>,
        first_due_date: Option<chrono::NaiveDate>,
    },
}

impl LargeExpenseDecision {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TreatAsVariableSpend => "treat_as_variable_spend",
            Self::FromSavings => "large_expense_from_savings",
            Self::ToFixedCost { .. } => "large_expense_to_fixed_cost",
        }
    }
}

/// A decision about any transaction, validated against the row's actual
/// category before any balance mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Deposit(DepositDecision),
    LargeExpense(LargeExpenseDecision),
}

impl Decision {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Deposit(d) => d.code(),
            Self::LargeExpense(d) => d.code(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Txn {
    pub id: i64,
    pub user_id: i64,
    pub external_id: String,
    pub account_id: String,
    /// Absolute magnitude; see `split_signed_amount` for the sign rule.
    pub amount: f64,
    pub date: String,
    pub name: String,
    pub merchant_name: Option<String>,
    pub pending: bool,
    pub suggested_kind: SuggestedKind,
    pub user_decision: String,
    pub counted_as_income: bool,
    pub is_large_expense_candidate: bool,
    pub large_expense_handled: bool,
}

impl Txn {
    /// Credits are the only rows given a suggested kind at ingestion, so
    /// "has a kind" doubles as "is a deposit".
    pub fn is_deposit(&self) -> bool {
        self.suggested_kind != SuggestedKind::Unknown
    }
}

/// The one place the provider's sign convention is interpreted: a negative
/// raw amount is an inflow (credit), positive is an outflow (debit). Rows
/// store the magnitude only.
pub fn split_signed_amount(raw: f64) -> (bool, f64) {
    (raw < 0.0, raw.abs())
}
