//! Page scraping for the few identifiers the export endpoints need.

use scraper::{Html, Selector};
use std::sync::OnceLock;

fn profile_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse(".user-profile.userId[data-userid]").expect("valid selector"))
}

fn any_user_id_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("[data-userid]").expect("valid selector"))
}

fn page_id_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse("meta[property='pageId']").expect("valid selector"))
}

fn user_list_selector() -> &'static Selector {
    static SELECTOR: OnceLock<Selector> = OnceLock::new();
    SELECTOR.get_or_init(|| Selector::parse(".user-list[id]").expect("valid selector"))
}

/// `prefix` followed by at least one digit and nothing else.
fn is_id(value: &str, prefix: &str) -> bool {
    value
        .strip_prefix(prefix)
        .map(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

fn first_attr(document: &Html, selector: &Selector, attr: &str, prefix: &str) -> Option<String> {
    document
        .select(selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::trim)
        .find(|value| is_id(value, prefix))
        .map(str::to_string)
}

/// User id from the profile page.
pub fn find_user_id(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    first_attr(&document, profile_selector(), "data-userid", "ur")
        .or_else(|| first_attr(&document, any_user_id_selector(), "data-userid", "ur"))
}

/// Watchlist list id from the `pageId` meta tag of the watchlist page.
pub fn find_watchlist_id(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    first_attr(&document, page_id_selector(), "content", "ls")
}

/// Ids of the `user-list` elements on the lists page, in page order.
///
/// Every lists page carries at least the watchlist row, so an empty result
/// means the markup was not recognised rather than "no lists".
pub fn find_list_ids(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut ids: Vec<String> = Vec::new();
    for element in document.select(user_list_selector()) {
        let Some(id) = element.value().id().map(str::trim) else {
            continue;
        };
        if is_id(id, "ls") && !ids.iter().any(|seen| seen == id) {
            ids.push(id.to_string());
        }
    }
    ids
}
