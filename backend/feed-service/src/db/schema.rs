/// Single-table key layout
///
/// Posts, likes and comments share the posts table. Every sort key that embeds
/// a timestamp goes through [`format_timestamp`], which is fixed width so that
/// lexical order equals chronological order. Writers and deleters must build
/// keys through these functions only.
use chrono::{DateTime, SecondsFormat, Utc};
use wide_column::{Item, ItemExt, StoreError, StoreResult};

pub const GSI1: &str = "GSI1";
pub const GSI1_PK: &str = "GSI1PK";
pub const GSI1_SK: &str = "GSI1SK";
pub const METADATA: &str = "METADATA";

pub const ENTITY_TYPE: &str = "entity_type";
pub const ENTITY_POST: &str = "POST";
pub const ENTITY_LIKE: &str = "LIKE";
pub const ENTITY_COMMENT: &str = "COMMENT";
pub const ENTITY_FEED: &str = "FEED";
pub const ENTITY_TRENDING: &str = "TRENDING";

pub const POST_PREFIX: &str = "POST#";
pub const COMMENT_PREFIX: &str = "COMMENT#";

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_timestamp(item: &Item, attr: &str) -> StoreResult<DateTime<Utc>> {
    let raw = item.req_s(attr)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Decode(format!("attribute {}: {}", attr, e)))
}

pub fn user_pk(user_id: &str) -> String {
    format!("USER#{}", user_id)
}

pub fn post_pk(post_id: &str) -> String {
    format!("{}{}", POST_PREFIX, post_id)
}

pub fn post_sk(created_at: &DateTime<Utc>, post_id: &str) -> String {
    format!("{}{}#{}", POST_PREFIX, format_timestamp(created_at), post_id)
}

pub fn like_sk(user_id: &str) -> String {
    user_pk(user_id)
}

pub fn comment_sk(created_at: &DateTime<Utc>, comment_id: &str) -> String {
    format!("{}{}#{}", COMMENT_PREFIX, format_timestamp(created_at), comment_id)
}

/// Feed entries sort by the post's creation time; the id suffix keeps two
/// posts created in the same instant apart.
pub fn feed_sk(post_created_at: &DateTime<Utc>, post_id: &str) -> String {
    format!("{}#{}", format_timestamp(post_created_at), post_id)
}

pub fn trending_pk(algorithm_version: &str) -> String {
    format!("TRENDING#{}", algorithm_version)
}

/// Zero-padded score followed by the post id. Descending reads give score
/// order with ties broken by post id, also descending.
pub fn trending_sk(score: f64, post_id: &str) -> String {
    format!("{:015.2}#{}", score.max(0.0), post_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_are_fixed_width() {
        let a = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let b = a + chrono::Duration::nanoseconds(1);
        assert_eq!(format_timestamp(&a).len(), format_timestamp(&b).len());
        assert!(format_timestamp(&a) < format_timestamp(&b));
        assert_eq!(format_timestamp(&a), "2024-05-01T10:00:00.000000000Z");
    }

    #[test]
    fn post_sort_key_is_reproducible_from_created_at() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let sk = post_sk(&ts, "p1");
        assert_eq!(sk, "POST#2024-05-01T10:00:00.123456789Z#p1");

        let mut item = Item::new();
        item.insert("created_at".into(), wide_column::AttrValue::s(format_timestamp(&ts)));
        let parsed = parse_timestamp(&item, "created_at").unwrap();
        assert_eq!(post_sk(&parsed, "p1"), sk);
    }

    #[test]
    fn trending_sort_keys_order_by_score() {
        let low = trending_sk(5.0, "C");
        let high = trending_sk(10.0, "A");
        let tied = trending_sk(10.0, "B");
        assert_eq!(high, "000000000010.00#A");
        assert!(low < high && high < tied);
        assert_eq!(trending_sk(-3.0, "X"), "000000000000.00#X");
    }
}
