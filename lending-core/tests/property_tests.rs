//! Property-based tests for lending invariants
//!
//! These tests use proptest to verify critical invariants:
//! - At most one open loan per book, under any operation interleaving
//! - Lifecycle: borrow → return → approve always completes for a lendable book
//! - Visibility flags gate borrowing regardless of who asks
//! - Closed loan cycles free the book for the next borrower

use lending_core::{
    types::BookDraft, BorrowWorkflow, Config, Error, Transaction,
};
use notification_bus::{ChannelDispatcher, LogDispatcher, NotificationKind};
use proptest::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

/// Strategy for generating book drafts
fn draft_strategy() -> impl Strategy<Value = BookDraft> {
    ("[A-Za-z ]{1,24}", "[A-Za-z ]{1,16}", "[0-9]{13}", any::<bool>()).prop_map(
        |(title, author, isbn, shareable)| BookDraft {
            title,
            author,
            isbn,
            synopsis: "A book".to_string(),
            shareable,
        },
    )
}

/// One step of a randomized loan workload
#[derive(Debug, Clone)]
enum LoanOp {
    Borrow(usize),
    Return(usize),
    Approve,
}

/// Strategy for generating loan operation sequences over a small user pool
fn ops_strategy() -> impl Strategy<Value = Vec<LoanOp>> {
    prop::collection::vec(
        prop_oneof![
            (0usize..4).prop_map(LoanOp::Borrow),
            (0usize..4).prop_map(LoanOp::Return),
            Just(LoanOp::Approve),
        ],
        1..40,
    )
}

/// Create test workflow with temp directory, logging notifications
fn create_test_workflow() -> (BorrowWorkflow, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();

    let workflow = BorrowWorkflow::open(config, Arc::new(LogDispatcher::new())).unwrap();
    (workflow, temp_dir)
}

fn lendable_draft() -> BookDraft {
    BookDraft {
        title: "The Left Hand of Darkness".to_string(),
        author: "Ursula K. Le Guin".to_string(),
        isbn: "9780441478125".to_string(),
        synopsis: "Gethen".to_string(),
        shareable: true,
    }
}

fn open_loans(history: &[Transaction]) -> usize {
    history.iter().filter(|t| t.is_open()).count()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: No interleaving of borrows, returns, and approvals ever
    /// produces more than one open loan on a book
    #[test]
    fn prop_at_most_one_open_loan(ops in ops_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (workflow, _temp) = create_test_workflow();
            let owner = Uuid::new_v4();
            let users: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
            let book_id = workflow.registry().add_book(owner, lendable_draft()).unwrap();

            for op in &ops {
                // Outcomes vary with interleaving; the invariant may not
                let _ = match op {
                    LoanOp::Borrow(u) => workflow.borrow(book_id, users[*u]).await.map(|_| ()),
                    LoanOp::Return(u) => workflow.return_book(book_id, users[*u]).await.map(|_| ()),
                    LoanOp::Approve => workflow.approve_return(book_id, owner).await.map(|_| ()),
                };

                let history = workflow.ledger().history_by_book(book_id).unwrap();
                prop_assert!(open_loans(&history) <= 1);
            }
            Ok(())
        })?;
    }

    /// Property: A lendable book completes the full loan cycle for any
    /// borrower who is not the owner
    #[test]
    fn prop_lifecycle_completes(title in "[A-Za-z ]{1,24}") {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (workflow, _temp) = create_test_workflow();
            let owner = Uuid::new_v4();
            let borrower = Uuid::new_v4();

            let mut draft = lendable_draft();
            draft.title = title;
            let book_id = workflow.registry().add_book(owner, draft).unwrap();

            let transaction_id = workflow.borrow(book_id, borrower).await.unwrap();
            prop_assert_eq!(workflow.return_book(book_id, borrower).await.unwrap(), transaction_id);
            prop_assert_eq!(workflow.approve_return(book_id, owner).await.unwrap(), transaction_id);

            let history = workflow.ledger().history_by_book(book_id).unwrap();
            prop_assert_eq!(history.len(), 1);
            prop_assert!(history[0].returned);
            prop_assert!(history[0].return_approved);
            Ok(())
        })?;
    }

    /// Property: A book that is not shareable, or archived, rejects every
    /// borrow attempt with Forbidden
    #[test]
    fn prop_flags_gate_borrowing(draft in draft_strategy(), archive in any::<bool>()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (workflow, _temp) = create_test_workflow();
            let owner = Uuid::new_v4();

            let lendable = draft.shareable && !archive;
            let book_id = workflow.registry().add_book(owner, draft).unwrap();
            if archive {
                workflow.registry().set_archived(book_id, owner, true).unwrap();
            }

            let result = workflow.borrow(book_id, Uuid::new_v4()).await;
            if lendable {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(matches!(result, Err(Error::Forbidden(_))));
            }

            // The owner is rejected no matter the flags
            prop_assert!(matches!(
                workflow.borrow(book_id, owner).await,
                Err(Error::Forbidden(_))
            ));
            Ok(())
        })?;
    }

    /// Property: After a closed loan cycle the book is immediately
    /// borrowable again, and history keeps every transaction
    #[test]
    fn prop_closed_cycles_accumulate(cycles in 1usize..6) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let (workflow, _temp) = create_test_workflow();
            let owner = Uuid::new_v4();
            let book_id = workflow.registry().add_book(owner, lendable_draft()).unwrap();

            for _ in 0..cycles {
                let borrower = Uuid::new_v4();
                workflow.borrow(book_id, borrower).await.unwrap();
                workflow.return_book(book_id, borrower).await.unwrap();
                workflow.approve_return(book_id, owner).await.unwrap();
            }

            let history = workflow.ledger().history_by_book(book_id).unwrap();
            prop_assert_eq!(history.len(), cycles);
            prop_assert_eq!(open_loans(&history), 0);
            prop_assert!(history.iter().all(|t| t.return_approved));
            Ok(())
        })?;
    }
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    /// Eight tasks race to borrow the same book; exactly one wins
    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_borrow_single_winner() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let workflow =
            Arc::new(BorrowWorkflow::open(config, Arc::new(LogDispatcher::new())).unwrap());
        let owner = Uuid::new_v4();
        let book_id = workflow
            .registry()
            .add_book(owner, lendable_draft())
            .unwrap();

        let barrier = Arc::new(tokio::sync::Barrier::new(8));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let workflow = Arc::clone(&workflow);
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                workflow.borrow(book_id, Uuid::new_v4()).await
            }));
        }

        let mut winners = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(Error::Conflict(_)) => conflicts += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(conflicts, 7);

        let history = workflow.ledger().history_by_book(book_id).unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].is_open());
    }

    /// Returns are approved oldest first when several are pending
    #[tokio::test]
    async fn test_oldest_pending_return_approved_first() {
        let (workflow, _temp) = create_test_workflow();
        let owner = Uuid::new_v4();
        let first_borrower = Uuid::new_v4();
        let second_borrower = Uuid::new_v4();
        let book_id = workflow
            .registry()
            .add_book(owner, lendable_draft())
            .unwrap();

        let first = workflow.borrow(book_id, first_borrower).await.unwrap();
        workflow.return_book(book_id, first_borrower).await.unwrap();

        // First return still pending; the book is free to borrow again
        let second = workflow.borrow(book_id, second_borrower).await.unwrap();
        workflow
            .return_book(book_id, second_borrower)
            .await
            .unwrap();

        assert_eq!(workflow.approve_return(book_id, owner).await.unwrap(), first);
        assert_eq!(
            workflow.approve_return(book_id, owner).await.unwrap(),
            second
        );
        assert!(matches!(
            workflow.approve_return(book_id, owner).await,
            Err(Error::TransactionNotFound(_))
        ));
    }

    /// Every committed transition emits exactly one notification, in order
    #[tokio::test]
    async fn test_notification_per_transition() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();

        let (dispatcher, mut receiver) = ChannelDispatcher::new();
        let workflow = BorrowWorkflow::open(config, Arc::new(dispatcher)).unwrap();
        let owner = Uuid::new_v4();
        let borrower = Uuid::new_v4();
        let book_id = workflow
            .registry()
            .add_book(owner, lendable_draft())
            .unwrap();

        // A failed borrow emits nothing
        let _ = workflow.borrow(book_id, owner).await;

        workflow.borrow(book_id, borrower).await.unwrap();
        workflow.return_book(book_id, borrower).await.unwrap();
        workflow.approve_return(book_id, owner).await.unwrap();

        let kinds = [
            NotificationKind::Borrowed,
            NotificationKind::Returned,
            NotificationKind::ReturnApproved,
        ];
        for kind in kinds {
            let notification = receiver.recv().await.unwrap();
            assert_eq!(notification.kind, kind);
            assert_eq!(notification.book_title, "The Left Hand of Darkness");
        }

        drop(workflow);
        assert!(receiver.recv().await.is_none());
    }

    /// A borrower's view: current loans vs handed-back loans
    #[tokio::test]
    async fn test_borrower_history_views() {
        let (workflow, _temp) = create_test_workflow();
        let owner = Uuid::new_v4();
        let borrower = Uuid::new_v4();

        let kept = workflow
            .registry()
            .add_book(owner, lendable_draft())
            .unwrap();
        let handed_back = workflow
            .registry()
            .add_book(owner, lendable_draft())
            .unwrap();

        workflow.borrow(kept, borrower).await.unwrap();
        workflow.borrow(handed_back, borrower).await.unwrap();
        workflow.return_book(handed_back, borrower).await.unwrap();

        let borrowed = workflow.ledger().borrowed_by_user(borrower).unwrap();
        assert_eq!(borrowed.len(), 1);
        assert_eq!(borrowed[0].book_id, kept);

        let returned = workflow.ledger().returned_by_user(borrower).unwrap();
        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].book_id, handed_back);
    }
}
