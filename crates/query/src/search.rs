//! Ties filtering, ordering and pagination together over an
//! [`EntityStore`].

use track_core::{Error, Experiment, PagedResult, Run, ViewType};
use track_storage::EntityStore;

use crate::eval::{matches_experiment, matches_run};
use crate::filter::Filter;
use crate::order::{self, parse_order_by};
use crate::page;

/// Search experiments matching `filter`, ordered and paginated.
pub fn search_experiments(
    store: &EntityStore,
    filter: &str,
    view_type: ViewType,
    max_results: Option<i64>,
    order_by: &[String],
    page_token: Option<&str>,
) -> Result<PagedResult<Experiment>, Error> {
    let parsed_filter = Filter::parse(filter)?;
    let order = parse_order_by(order_by)?;
    let page_size = page::resolve_max_results(
        max_results,
        store.config().search_max_results_default,
        store.config().search_max_results_limit,
    )?;

    let mut matched: Vec<Experiment> = store
        .list_experiments(view_type)?
        .into_iter()
        .filter(|e| matches_experiment(&parsed_filter, e))
        .collect();
    order::sort_experiments(&mut matched, &order);

    let (items, next_page_token) = page::paginate(&matched, page_token, page_size)?;
    Ok(PagedResult { items, next_page_token })
}

/// Search runs under `experiment_ids` matching `filter`, ordered and
/// paginated.
pub fn search_runs(
    store: &EntityStore,
    experiment_ids: &[String],
    filter: &str,
    view_type: ViewType,
    max_results: Option<i64>,
    order_by: &[String],
    page_token: Option<&str>,
) -> Result<PagedResult<Run>, Error> {
    let parsed_filter = Filter::parse(filter)?;
    let order = parse_order_by(order_by)?;
    let page_size = page::resolve_max_results(
        max_results,
        store.config().search_max_results_default,
        store.config().search_max_results_limit,
    )?;

    let mut matched: Vec<Run> = store
        .list_runs(experiment_ids, view_type)?
        .into_iter()
        .filter(|r| matches_run(&parsed_filter, r))
        .collect();
    order::sort_runs(&mut matched, &order);

    let (items, next_page_token) = page::paginate(&matched, page_token, page_size)?;
    Ok(PagedResult { items, next_page_token })
}
