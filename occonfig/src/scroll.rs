//! Scroll window planning for grouped lists.
//!
//! A grouped list is a flat sequence of group headers, each followed by the
//! items of that group. [`plan`] picks the rows to show in a fixed-height
//! viewport so the selection stays visible, the window moves as little as
//! possible between calls, and a header is pulled into view together with
//! the item directly below it whenever the selection allows.

use std::collections::HashMap;

/// A row of a grouped list.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatItem<T> {
    Header { group_id: String, label: String },
    Item { payload: T, full_id: String },
}

impl<T> FlatItem<T> {
    pub fn is_header(&self) -> bool {
        matches!(self, FlatItem::Header { .. })
    }

    pub fn is_item(&self) -> bool {
        matches!(self, FlatItem::Item { .. })
    }
}

/// Group `items` by `group_of`, groups in first-seen order, each preceded by
/// a header labelled with `label_of(group_id)`.
pub fn group_into_flat_list<T>(
    items: impl IntoIterator<Item = T>,
    group_of: impl Fn(&T) -> &str,
    full_id_of: impl Fn(&T) -> String,
    label_of: impl Fn(&str) -> String,
) -> Vec<FlatItem<T>> {
    let mut groups: Vec<(String, Vec<T>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let group = group_of(&item).to_string();
        let slot = *index.entry(group.clone()).or_insert_with(|| {
            groups.push((group, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(item);
    }

    let mut flat = Vec::new();
    for (group_id, members) in groups {
        flat.push(FlatItem::Header {
            label: label_of(&group_id),
            group_id,
        });
        for payload in members {
            let full_id = full_id_of(&payload);
            flat.push(FlatItem::Item { payload, full_id });
        }
    }
    flat
}

/// Indices of the selectable (item) rows.
pub fn selectable_indices<T>(flat: &[FlatItem<T>]) -> Vec<usize> {
    flat.iter()
        .enumerate()
        .filter(|(_, item)| item.is_item())
        .map(|(i, _)| i)
        .collect()
}

/// Rows to display, with their absolute indices.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrollWindow<'a, T> {
    pub window: Vec<(usize, &'a FlatItem<T>)>,
    /// Index of the first displayed row; feed it back as `previous_offset`.
    pub offset: usize,
    pub has_more_above: bool,
    pub has_more_below: bool,
}

/// Plan the viewport for `flat`.
///
/// # Arguments
///
/// * `selectable` - absolute indices of selectable rows
/// * `selected` - position in `selectable` of the current selection; out of
///   range selects row 0
/// * `height` - viewport height in rows
/// * `previous_offset` - offset returned by the previous call
pub fn plan<'a, T>(
    flat: &'a [FlatItem<T>],
    selectable: &[usize],
    selected: usize,
    height: usize,
    previous_offset: usize,
) -> ScrollWindow<'a, T> {
    if flat.is_empty() || height == 0 {
        return ScrollWindow {
            window: Vec::new(),
            offset: 0,
            has_more_above: false,
            has_more_below: false,
        };
    }

    let len = flat.len();
    let max_offset = len.saturating_sub(height);
    let target = selectable.get(selected).copied().unwrap_or(0).min(len - 1);

    let mut offset = previous_offset.min(max_offset);
    if target < offset {
        offset = target;
    }
    if target >= offset + height {
        offset = target + 1 - height;
    }
    offset = offset.min(max_offset);

    // show the selection's group header when it fits
    if let Some(header) = (0..=target).rev().find(|&i| flat[i].is_header()) {
        if header < offset && target - header < height {
            offset = header;
        }
    }

    // never leave a header just above an item at the top of the window
    while offset > 0
        && flat[offset].is_item()
        && flat[offset - 1].is_header()
        && target < offset - 1 + height
    {
        offset -= 1;
    }

    let end = (offset + height).min(len);
    ScrollWindow {
        window: (offset..end).map(|i| (i, &flat[i])).collect(),
        offset,
        has_more_above: offset > 0,
        has_more_below: offset + height < len,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grouped(groups: &[(&str, &[&str])]) -> Vec<FlatItem<String>> {
        let items = groups
            .iter()
            .flat_map(|(group, members)| members.iter().map(move |m| (group.to_string(), m.to_string())));
        group_into_flat_list(
            items,
            |(group, _)| group.as_str(),
            |(group, id)| format!("{group}/{id}"),
            |group| group.to_uppercase(),
        )
        .into_iter()
        .map(|item| match item {
            FlatItem::Header { group_id, label } => FlatItem::Header { group_id, label },
            FlatItem::Item { payload, full_id } => FlatItem::Item {
                payload: payload.1,
                full_id,
            },
        })
        .collect()
    }

    fn labels(window: &ScrollWindow<'_, String>) -> Vec<String> {
        window
            .window
            .iter()
            .map(|(_, item)| match item {
                FlatItem::Header { label, .. } => format!("H:{label}"),
                FlatItem::Item { full_id, .. } => format!("M:{full_id}"),
            })
            .collect()
    }

    fn providers() -> Vec<FlatItem<String>> {
        grouped(&[
            ("opencode", &["glm-5-free", "gpt-5-nano"]),
            ("openai", &["gpt-5.3-codex-spark"]),
        ])
    }

    #[test]
    fn test_group_into_flat_list() {
        let flat = grouped(&[("b", &["1"]), ("a", &["2"]), ("b", &["3"])]);
        let rows: Vec<String> = flat
            .iter()
            .map(|item| match item {
                FlatItem::Header { label, .. } => format!("H:{label}"),
                FlatItem::Item { full_id, .. } => format!("M:{full_id}"),
            })
            .collect();
        assert_eq!(rows, ["H:B", "M:b/1", "M:b/3", "H:A", "M:a/2"]);
        assert_eq!(selectable_indices(&flat), [1, 2, 4]);
    }

    #[test]
    fn test_header_shown_above_first_group() {
        let flat = providers();
        let selectable = selectable_indices(&flat);
        let window = plan(&flat, &selectable, 1, 4, 0);
        assert!(window.window[0].1.is_header());
        assert_eq!(window.offset, 0);
        assert!(window.has_more_below);
        assert!(!window.has_more_above);
    }

    #[test]
    fn test_header_not_split_from_item() {
        let flat = providers();
        let selectable = selectable_indices(&flat);
        let window = plan(&flat, &selectable, 2, 3, 0);
        assert_eq!(labels(&window), ["M:opencode/gpt-5-nano", "H:OPENAI", "M:openai/gpt-5.3-codex-spark"]);
        assert_eq!(window.offset, 2);
        assert!(!window.has_more_below);
    }

    #[test]
    fn test_last_row_item_keeps_header() {
        let flat = providers();
        let selectable = selectable_indices(&flat);
        let window = plan(&flat, &selectable, 2, 4, 0);
        assert!(labels(&window).contains(&"H:OPENAI".to_string()));
        assert_eq!(window.offset, 1);
    }

    #[test]
    fn test_previous_offset_is_sticky() {
        let flat = providers();
        let selectable = selectable_indices(&flat);
        let first = plan(&flat, &selectable, 1, 4, 0);
        let second = plan(&flat, &selectable, 0, 4, first.offset);
        assert_eq!(first.offset, second.offset);

        let scrolled = plan(&flat, &selectable, 2, 4, first.offset);
        assert_eq!(scrolled.offset, 1);
        // moving back up shows the first header again
        let back = plan(&flat, &selectable, 1, 4, scrolled.offset);
        assert_eq!(back.offset, 0);

        let flat = grouped(&[("a", &["1", "2", "3", "4", "5", "6"])]);
        let selectable = selectable_indices(&flat);
        let mut offset = plan(&flat, &selectable, 5, 3, 0).offset;
        assert_eq!(offset, 4);
        for (selected, expected) in [(4, 4), (3, 4), (2, 3), (1, 0)] {
            offset = plan(&flat, &selectable, selected, 3, offset).offset;
            assert_eq!(offset, expected, "selected {selected}");
        }
    }

    #[test]
    fn test_pulls_header_into_view() {
        let flat = grouped(&[("a", &["1", "2", "3"]), ("b", &["4", "5"])]);
        let selectable = selectable_indices(&flat);
        // selecting b/4 from the top scrolls just enough, then includes H:B
        let window = plan(&flat, &selectable, 3, 2, 0);
        assert_eq!(labels(&window), ["H:B", "M:b/4"]);

        // the top row under its header pulls the header in when room remains
        let window = plan(&flat, &selectable, 0, 3, 1);
        assert_eq!(window.offset, 0);
    }

    #[test]
    fn test_degenerate_inputs() {
        let empty: Vec<FlatItem<String>> = Vec::new();
        let window = plan(&empty, &[], 0, 5, 3);
        assert!(window.window.is_empty());
        assert_eq!(window.offset, 0);

        let flat = providers();
        let window = plan(&flat, &[], 7, 0, 2);
        assert!(window.window.is_empty());

        let window = plan(&flat, &selectable_indices(&flat), 99, 10, 4);
        assert_eq!(window.window.len(), flat.len());
        assert!(!window.has_more_above && !window.has_more_below);
    }

    #[test]
    fn test_selection_always_visible() {
        let flat = grouped(&[
            ("a", &["1", "2"]),
            ("b", &["3"]),
            ("c", &["4", "5", "6"]),
            ("d", &["7"]),
        ]);
        let selectable = selectable_indices(&flat);

        for height in 1..=flat.len() + 1 {
            for previous in 0..=flat.len() {
                for (selected, &target) in selectable.iter().enumerate() {
                    let window = plan(&flat, &selectable, selected, height, previous);
                    assert!(
                        window.window.iter().any(|(i, _)| *i == target),
                        "height {height}, previous {previous}, selected {selected}"
                    );

                    let offset = window.offset;
                    if offset > 0 && flat[offset].is_item() && flat[offset - 1].is_header() {
                        assert!(target >= offset - 1 + height, "orphaned header at {offset}");
                    }
                    assert!(window.window.len() <= height);
                }
            }
        }
    }
}
