//! Supersession ("update as archive-old-create-new") helpers.
//!
//! An edited payment order keeps its external form number: the old form row
//! is archived with `number = None` / `edited_number = old`, and the new
//! revision's form reuses the number, increment and group recorded here.

use serde::{Deserialize, Serialize};

use ledgerpay_forms::Form;

/// Numbering carried from the superseded form to its replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormCarryOver {
    pub number: String,
    pub increment_number: u32,
    pub increment_group: u32,
}

impl FormCarryOver {
    /// Extract the carry-over before the old form is archived. Returns
    /// `None` for forms that were already superseded (no active number).
    pub fn from_form(form: &Form) -> Option<Self> {
        Some(Self {
            number: form.number.clone()?,
            increment_number: form.increment_number,
            increment_group: form.increment_group,
        })
    }
}

/// Activity label for the N-th update of a document.
pub fn update_activity_label(prior_updates: u32) -> String {
    format!("Update - {}", prior_updates + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ledgerpay_core::{TenantId, UserId};
    use ledgerpay_forms::FormableType;
    use uuid::Uuid;

    #[test]
    fn carry_over_preserves_numbering() {
        let form = Form::pending(
            TenantId::new(),
            FormableType::PaymentOrder,
            Uuid::now_v7(),
            "PP2101007".to_string(),
            7,
            202101,
            Utc::now(),
            None,
            UserId::new(),
            UserId::new(),
        );

        let carry = FormCarryOver::from_form(&form).unwrap();
        assert_eq!(carry.number, "PP2101007");
        assert_eq!(carry.increment_number, 7);
        assert_eq!(carry.increment_group, 202101);
    }

    #[test]
    fn archived_form_has_no_carry_over() {
        let mut form = Form::pending(
            TenantId::new(),
            FormableType::PaymentOrder,
            Uuid::now_v7(),
            "PP2101007".to_string(),
            7,
            202101,
            Utc::now(),
            None,
            UserId::new(),
            UserId::new(),
        );
        form.archive_as_revision();
        assert!(FormCarryOver::from_form(&form).is_none());
    }

    #[test]
    fn update_labels_count_from_one() {
        assert_eq!(update_activity_label(0), "Update - 1");
        assert_eq!(update_activity_label(2), "Update - 3");
    }
}
