//! Paginated wallet history.

use crate::{
    core::Economy,
    entities::{TransactionLog, transaction_log},
    errors::Result,
};
use sea_orm::{PaginatorTrait, QueryOrder, prelude::*};

/// One page of a user's transaction log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPage {
    /// Entries, newest first
    pub entries: Vec<transaction_log::Model>,
    /// 1-based page shown
    pub page: u64,
    /// Number of pages, at least 1
    pub total_pages: u64,
    /// Number of log rows for the user
    pub total_entries: u64,
}

/// Returns page `page` (1-based) of a user's history. Pages past the end show the last page.
pub async fn history(eco: &Economy, user_id: i64, page: u64) -> Result<HistoryPage> {
    let per_page = eco.config.leaderboard.history_page_size.max(1);
    let paginator = TransactionLog::find()
        .filter(transaction_log::Column::UserId.eq(user_id))
        .order_by_desc(transaction_log::Column::Id)
        .paginate(&eco.db, per_page);

    let totals = paginator.num_items_and_pages().await?;
    let total_pages = totals.number_of_pages.max(1);
    let page = page.clamp(1, total_pages);
    let entries = paginator.fetch_page(page - 1).await?;

    Ok(HistoryPage {
        entries,
        page,
        total_pages,
        total_entries: totals.number_of_items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_history_pages() -> Result<()> {
        let eco = setup_economy().await?;
        for i in 1..=23 {
            fund(&eco.db, 1, i).await?;
        }
        fund(&eco.db, 2, 5).await?;

        let first = history(&eco, 1, 1).await?;
        assert_eq!(first.total_entries, 23);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.entries.len(), 10);
        assert_eq!(first.entries[0].amount, 23);

        let last = history(&eco, 1, 7).await?;
        assert_eq!(last.page, 3);
        assert_eq!(last.entries.len(), 3);
        assert_eq!(last.entries[2].amount, 1);

        let empty = history(&eco, 9, 1).await?;
        assert_eq!(empty.total_pages, 1);
        assert!(empty.entries.is_empty());
        Ok(())
    }
}
