use super::*;

#[test]
fn idle_by_default() {
    let busy = BusyIndicator::new();
    assert!(!busy.is_active());
    assert_eq!(busy.depth(), 0);
}

#[test]
fn overlapping_guards_coalesce() {
    let busy = BusyIndicator::new();
    let first = busy.start();
    let second = busy.clone().start();
    assert_eq!(busy.depth(), 2);

    drop(first);
    assert!(busy.is_active());
    drop(second);
    assert!(!busy.is_active());
}

#[tokio::test]
async fn guard_released_on_error_path() {
    async fn failing(busy: &BusyIndicator) -> Result<(), String> {
        let _guard = busy.start();
        tokio::task::yield_now().await;
        Err("boom".into())
    }

    let busy = BusyIndicator::new();
    assert!(failing(&busy).await.is_err());
    assert_eq!(busy.depth(), 0);
}
