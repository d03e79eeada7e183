//! Portfolio export for the connected account.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    services::{grid::PixelId, pixel::PixelRecord},
    types::{Address, Color},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioPixel {
    pub id: PixelId,
    pub color: Color,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioDocument {
    /// Unix milliseconds.
    pub snapshot: i64,
    pub pixels: Vec<PortfolioPixel>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioFile {
    pub file_name: String,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorGroup {
    /// Leading `#RGB` of the hex form, e.g. `#FF5`.
    pub prefix: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub pixels_owned: usize,
    pub color_groups: Vec<ColorGroup>,
}

pub fn file_name(account: &Address, now: DateTime<Utc>) -> String {
    let prefix: String = account.as_str().chars().take(6).collect();
    format!("pixel-portfolio-{prefix}-{}.json", now.format("%Y-%m-%d"))
}

/// Serialises `owned` (ordered by id) as the downloadable portfolio file.
pub fn export<'a>(
    account: &Address,
    owned: impl IntoIterator<Item = &'a PixelRecord>,
    now: DateTime<Utc>,
) -> Result<PortfolioFile> {
    let mut pixels: Vec<PortfolioPixel> = owned
        .into_iter()
        .map(|record| PortfolioPixel {
            id: record.id,
            color: record.color,
            x: record.x,
            y: record.y,
        })
        .collect();
    pixels.sort_by_key(|pixel| pixel.id);

    let document = PortfolioDocument {
        snapshot: now.timestamp_millis(),
        pixels,
    };
    let contents = serde_json::to_string_pretty(&document)?;
    tracing::info!(account = %account, pixels = document.pixels.len(), "Portfolio exported");

    Ok(PortfolioFile {
        file_name: file_name(account, now),
        contents,
    })
}

pub fn summarize<'a>(owned: impl IntoIterator<Item = &'a PixelRecord>) -> PortfolioSummary {
    let mut groups: BTreeMap<String, usize> = BTreeMap::new();
    let mut total = 0;
    for record in owned {
        let prefix: String = record.color.to_hex().chars().take(4).collect();
        *groups.entry(prefix).or_default() += 1;
        total += 1;
    }

    let color_groups = groups
        .into_iter()
        .map(|(prefix, count)| ColorGroup {
            prefix,
            count,
            percentage: count as f64 * 100.0 / total as f64,
        })
        .collect();

    PortfolioSummary {
        pixels_owned: total,
        color_groups,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::{services::pixel::RecordSource, types::Owner};

    fn record(id: PixelId, color: &str, owner: &Address) -> PixelRecord {
        PixelRecord {
            id,
            x: (id % 1000) as u32,
            y: (id / 1000) as u32,
            owner: Owner::Account(owner.clone()),
            color: Color::parse(color).unwrap(),
            source: RecordSource::Optimistic,
        }
    }

    #[test]
    fn export_writes_sorted_pretty_json() {
        let account = Address::parse("0xABCD").unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let records = [record(2002, "#00ff00", &account), record(105, "#FF0000", &account)];

        let file = export(&account, records.iter(), now).unwrap();
        assert_eq!(file.file_name, "pixel-portfolio-0xABCD-2024-03-09.json");
        assert!(file.contents.contains('\n'));

        let document: PortfolioDocument = serde_json::from_str(&file.contents).unwrap();
        assert_eq!(document.snapshot, now.timestamp_millis());
        assert_eq!(
            document.pixels,
            vec![
                PortfolioPixel { id: 105, color: Color::rgb(0xFF, 0, 0), x: 105, y: 0 },
                PortfolioPixel { id: 2002, color: Color::rgb(0, 0xFF, 0), x: 2, y: 2 },
            ]
        );
    }

    #[test]
    fn summary_groups_by_color_prefix() {
        let account = Address::parse("0xABCD").unwrap();
        let records = [
            record(1, "#FF5733", &account),
            record(2, "#FF5A00", &account),
            record(3, "#3357FF", &account),
            record(4, "#3357FF", &account),
        ];

        let summary = summarize(records.iter());
        assert_eq!(summary.pixels_owned, 4);
        assert_eq!(summary.color_groups.len(), 2);
        assert_eq!(summary.color_groups[1].prefix, "#FF5");
        assert_eq!(summary.color_groups[1].percentage, 50.0);
    }

    #[test]
    fn empty_portfolio_has_no_groups() {
        let summary = summarize(std::iter::empty());
        assert_eq!(summary.pixels_owned, 0);
        assert!(summary.color_groups.is_empty());
    }
}
