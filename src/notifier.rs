use colored::Colorize;

use crate::error::Result;
use crate::fmt::money;
use crate::models::{SuggestedKind, Txn};

/// Push-delivery collaborator. Callers treat every method as fire-and-forget:
/// failures are logged and swallowed, never propagated into reconciliation.
pub trait Notifier {
    fn notify_transaction(&self, tx: &Txn, dynamic_balance: f64) -> Result<()>;
    fn notify_user(&self, user_id: i64, title: &str, body: &str) -> Result<()>;
}

/// Prints notifications to the terminal, one line of title plus body.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify_transaction(&self, tx: &Txn, dynamic_balance: f64) -> Result<()> {
        let merchant = tx.merchant_name.as_deref().unwrap_or(&tx.name);
        let (title, body) = if tx.suggested_kind == SuggestedKind::Paycheck {
            (
                "New paycheck detected".to_string(),
                format!(
                    "Your period spend limit is currently {}. Decide how to use this deposit.",
                    money(dynamic_balance)
                ),
            )
        } else if tx.is_large_expense_candidate && !tx.large_expense_handled {
            (
                "Large purchase spotted".to_string(),
                format!(
                    "{} at {merchant}. Period spend limit is now {}. \
                     Choose: pay from savings, convert to fixed cost, or treat as normal spend.",
                    money(tx.amount),
                    money(dynamic_balance)
                ),
            )
        } else {
            (
                format!("New charge: {merchant}"),
                format!(
                    "-{}. Period spend limit is now {}.",
                    money(tx.amount),
                    money(dynamic_balance)
                ),
            )
        };
        println!("{} {}", title.bold(), body);
        Ok(())
    }

    fn notify_user(&self, _user_id: i64, title: &str, body: &str) -> Result<()> {
        println!("{} {}", title.bold(), body);
        Ok(())
    }
}

#[cfg(test)]
pub mod test_support {
    use std::cell::RefCell;

    use super::*;
    use crate::error::PennyError;

    /// Records every notification; optionally fails, to prove callers
    /// swallow notifier errors.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub sent: RefCell<Vec<(String, f64)>>,
        pub fail: bool,
    }

    impl Notifier for RecordingNotifier {
        fn notify_transaction(&self, tx: &Txn, dynamic_balance: f64) -> Result<()> {
            if self.fail {
                return Err(PennyError::Upstream("push endpoint down".into()));
            }
            self.sent
                .borrow_mut()
                .push((tx.external_id.clone(), dynamic_balance));
            Ok(())
        }

        fn notify_user(&self, _user_id: i64, title: &str, _body: &str) -> Result<()> {
            if self.fail {
                return Err(PennyError::Upstream("push endpoint down".into()));
            }
            self.sent.borrow_mut().push((title.to_string(), 0.0));
            Ok(())
        }
    }
}
