//! Listing query builder using SeaQuery.
//!
//! Folds the base retrieval strategy, the caller's filter predicates, and
//! the continuation cursor into exactly one SELECT. Filters are applied on
//! top of the base retrieval, they never change which partition is read;
//! that cost shape is part of the contract, not an accident.

use sea_query::{Cond, Expr, ExprTrait, Iden, Order, PostgresQueryBuilder, Query, SelectStatement, SimpleExpr};

use crate::models::Visibility;
use crate::query::cursor::PageCursor;
use crate::query::params::{ListParams, Predicate, VisibilityScope};

/// Identifiers for the entry table.
#[derive(Iden)]
enum EntryIden {
    #[iden = "entry"]
    Table,
    Id,
    OwnerId,
    CreatedAt,
    UpdatedAt,
    Title,
    Body,
    Tags,
    Mood,
    Visibility,
    Viewers,
    Attachments,
}

/// How the page is pulled out of the store before filters apply.
#[derive(Debug, Clone, PartialEq)]
pub enum BaseRetrieval {
    /// Key-based retrieval on the caller's owner partition, optionally
    /// narrowed to a single visibility tier.
    OwnerPartition {
        owner_id: String,
        visibility: Option<Visibility>,
    },
    /// Scan filtered to public entries. There is no index keyed on
    /// visibility alone; this is the carried-over scale limitation.
    PublicScan,
}

impl BaseRetrieval {
    /// Pick the strategy for a scope. `all` resolves to the owner
    /// partition: one retrieval per request, and a caller's own entries
    /// are visible to them at every tier.
    pub fn for_scope(caller_id: &str, scope: VisibilityScope) -> Self {
        match scope {
            VisibilityScope::All => BaseRetrieval::OwnerPartition {
                owner_id: caller_id.to_string(),
                visibility: None,
            },
            VisibilityScope::Private => BaseRetrieval::OwnerPartition {
                owner_id: caller_id.to_string(),
                visibility: Some(Visibility::Private),
            },
            VisibilityScope::Shared => BaseRetrieval::OwnerPartition {
                owner_id: caller_id.to_string(),
                visibility: Some(Visibility::Shared),
            },
            VisibilityScope::Public => BaseRetrieval::PublicScan,
        }
    }
}

/// Query builder for entry listings.
pub struct EntryQueryBuilder {
    base: BaseRetrieval,
    predicates: Vec<Predicate>,
    cursor: Option<PageCursor>,
    page_size: u32,
}

impl EntryQueryBuilder {
    /// Create a builder for one validated listing request.
    pub fn new(caller_id: &str, params: &ListParams) -> Self {
        Self {
            base: BaseRetrieval::for_scope(caller_id, params.scope),
            predicates: params.predicates.clone(),
            cursor: params.cursor,
            page_size: params.page_size,
        }
    }

    /// Build the SELECT. Fetches one row beyond the page so a single
    /// retrieval also answers "is there more".
    pub fn build(&self) -> String {
        let mut query = Query::select();

        query
            .columns([
                EntryIden::Id,
                EntryIden::OwnerId,
                EntryIden::CreatedAt,
                EntryIden::UpdatedAt,
                EntryIden::Title,
                EntryIden::Body,
                EntryIden::Tags,
                EntryIden::Mood,
                EntryIden::Visibility,
                EntryIden::Viewers,
                EntryIden::Attachments,
            ])
            .from(EntryIden::Table);

        self.add_base(&mut query);

        for predicate in &self.predicates {
            if let Some(condition) = predicate_condition(predicate) {
                query.and_where(condition);
            }
        }

        self.add_cursor(&mut query);

        query
            .order_by((EntryIden::Table, EntryIden::CreatedAt), Order::Desc)
            .order_by((EntryIden::Table, EntryIden::Id), Order::Desc)
            .limit(u64::from(self.page_size) + 1);

        query.to_string(PostgresQueryBuilder)
    }

    /// Apply the base retrieval strategy.
    fn add_base(&self, query: &mut SelectStatement) {
        match &self.base {
            BaseRetrieval::OwnerPartition {
                owner_id,
                visibility,
            } => {
                query.and_where(
                    Expr::col((EntryIden::Table, EntryIden::OwnerId)).eq(owner_id.clone()),
                );
                if let Some(tier) = visibility {
                    query.and_where(
                        Expr::col((EntryIden::Table, EntryIden::Visibility)).eq(tier.as_str()),
                    );
                }
            }
            BaseRetrieval::PublicScan => {
                query.and_where(
                    Expr::col((EntryIden::Table, EntryIden::Visibility))
                        .eq(Visibility::Public.as_str()),
                );
            }
        }
    }

    /// Resume strictly after the cursor row in (created_at, id) descending
    /// order: no duplicate and no skipped row at the page boundary.
    fn add_cursor(&self, query: &mut SelectStatement) {
        let Some(cursor) = &self.cursor else {
            return;
        };

        let tie_break = Cond::all()
            .add(Expr::col((EntryIden::Table, EntryIden::CreatedAt)).eq(cursor.created_at))
            .add(Expr::col((EntryIden::Table, EntryIden::Id)).lt(cursor.id));

        let resume = Cond::any()
            .add(Expr::col((EntryIden::Table, EntryIden::CreatedAt)).lt(cursor.created_at))
            .add(tie_break);

        query.and_where(resume.into());
    }
}

/// Build a single predicate's condition. Predicates are pure conjuncts;
/// the only internal OR is the free-text span over title, body, and tags.
fn predicate_condition(predicate: &Predicate) -> Option<SimpleExpr> {
    match predicate {
        Predicate::TagContains(tag) => Some(Expr::cust_with_values(
            r#"$1 = ANY("entry"."tags")"#,
            [tag.clone()],
        )),
        Predicate::MoodEquals(mood) => {
            Some(Expr::col((EntryIden::Table, EntryIden::Mood)).eq(mood.as_str()))
        }
        Predicate::DateRange { from, to } => {
            if from.is_none() && to.is_none() {
                return None;
            }
            let mut cond = Cond::all();
            if let Some(from) = from {
                cond = cond
                    .add(Expr::col((EntryIden::Table, EntryIden::CreatedAt)).gte(*from));
            }
            if let Some(to) = to {
                cond =
                    cond.add(Expr::col((EntryIden::Table, EntryIden::CreatedAt)).lte(*to));
            }
            Some(cond.into())
        }
        Predicate::TextContains(text) => {
            let pattern = format!("%{}%", escape_like_wildcards(text));
            let cond = Cond::any()
                .add(Expr::col((EntryIden::Table, EntryIden::Title)).like(pattern.clone()))
                .add(Expr::col((EntryIden::Table, EntryIden::Body)).like(pattern.clone()))
                .add(Expr::cust_with_values(
                    r#"array_to_string("entry"."tags", ' ') LIKE $1"#,
                    [pattern],
                ));
            Some(cond.into())
        }
    }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
