//! Assertion helpers for the funding invariants, shared by the test modules.

use crate::models::Funding;

/// Amounts stay within bounds and the closed flag tracks them exactly.
pub fn assert_funding_invariant(f: &Funding) {
    assert!(
        f.invested_amount >= 0,
        "negative invested amount: {}",
        f.invested_amount
    );
    assert!(
        f.invested_amount <= f.full_amount,
        "invested {} exceeds full amount {}",
        f.invested_amount,
        f.full_amount
    );
    assert_eq!(
        f.fully_invested,
        f.invested_amount == f.full_amount,
        "fully_invested flag out of sync: {f:?}"
    );
    assert_eq!(
        f.fully_invested,
        f.close_date.is_some(),
        "close_date out of sync with fully_invested: {f:?}"
    );
}

/// Each transferred unit leaves both the project's and the donation's room.
pub fn assert_room_conserved(
    project_before: &Funding,
    donation_before: &Funding,
    project_after: &Funding,
    donation_after: &Funding,
    transferred: i64,
) {
    assert_eq!(project_before.room() - transferred, project_after.room());
    assert_eq!(donation_before.room() - transferred, donation_after.room());
    assert_eq!(
        project_before.room() + donation_before.room(),
        project_after.room() + donation_after.room() + 2 * transferred,
        "money created or destroyed"
    );
}

/// A close timestamp, once set, never moves.
pub fn assert_close_date_stable(before: &Funding, after: &Funding) {
    if let Some(closed) = before.close_date {
        assert_eq!(after.close_date, Some(closed), "close_date changed");
        assert!(after.fully_invested);
    }
}
