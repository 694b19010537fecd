use crate::domain::{error::IngestionError, models::Quarter};

/// Every quarter from `start` through `end`, inclusive. Without an end the
/// range is `start` alone.
pub fn quarters_between(start: Quarter, end: Option<Quarter>) -> Result<Vec<Quarter>, IngestionError> {
    let end = end.unwrap_or(start);
    if end < start {
        return Err(IngestionError::Config(format!(
            "end quarter {} is before start quarter {}",
            end, start
        )));
    }

    let mut quarters = vec![start];
    let mut current = start;
    while current < end {
        match current.next() {
            Some(next) => {
                quarters.push(next);
                current = next;
            }
            None => break,
        }
    }
    Ok(quarters)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(value: &str) -> Quarter {
        Quarter::parse(value).unwrap()
    }

    #[test]
    fn inclusive_range_across_years() {
        let quarters = quarters_between(q("1994-03"), Some(q("1995-03"))).unwrap();
        let rendered: Vec<String> = quarters.iter().map(|q| q.to_string()).collect();
        assert_eq!(rendered, vec!["1994-03", "1994-06", "1994-09", "1994-12", "1995-03"]);
    }

    #[test]
    fn missing_end_means_single_quarter() {
        assert_eq!(quarters_between(q("2020-09"), None).unwrap(), vec![q("2020-09")]);
        assert_eq!(quarters_between(q("2020-09"), Some(q("2020-09"))).unwrap(), vec![q("2020-09")]);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = quarters_between(q("2020-09"), Some(q("2020-06"))).unwrap_err();
        assert!(matches!(err, IngestionError::Config(_)));
    }
}
