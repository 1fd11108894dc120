use chrono::{DateTime, Utc};
use vpnmon_core::{AvailabilitySummary, ProbeOutcome, Report, Verdict};

/// Turns unordered probe outcomes into a stable report
pub struct Reporter;

impl Reporter {
    /// Order outcomes as Available, Unavailable, Errored, each by ascending
    /// node id, so reports diff cleanly regardless of completion order
    pub fn build(timestamp: DateTime<Utc>, outcomes: Vec<ProbeOutcome>) -> Report {
        let mut available = Vec::new();
        let mut unavailable = Vec::new();
        let mut errored = Vec::new();

        for outcome in outcomes {
            match outcome.status {
                Verdict::Available => available.push(outcome),
                Verdict::Unavailable => unavailable.push(outcome),
                Verdict::Errored => errored.push(outcome),
            }
        }

        let mut results = Vec::with_capacity(available.len() + unavailable.len() + errored.len());
        for mut bucket in [available, unavailable, errored] {
            bucket.sort_by_key(|outcome| outcome.node_id);
            results.append(&mut bucket);
        }

        Report { timestamp, results }
    }

    pub fn summary(available: usize, total: usize) -> AvailabilitySummary {
        AvailabilitySummary { available, total }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpnmon_core::Node;

    fn outcome(id: u64, status: Verdict) -> ProbeOutcome {
        ProbeOutcome::new(&Node::new(id, format!("relay{id}")), status, None)
    }

    fn ids(report: &Report) -> Vec<u64> {
        report.results.iter().map(|o| o.node_id).collect()
    }

    #[test]
    fn test_available_before_errored() {
        let report = Reporter::build(
            Utc::now(),
            vec![
                outcome(2, Verdict::Errored),
                outcome(3, Verdict::Available),
                outcome(1, Verdict::Available),
            ],
        );
        assert_eq!(ids(&report), vec![1, 3, 2]);
    }

    #[test]
    fn test_buckets_sorted_by_id() {
        let report = Reporter::build(
            Utc::now(),
            vec![
                outcome(9, Verdict::Unavailable),
                outcome(4, Verdict::Errored),
                outcome(7, Verdict::Available),
                outcome(1, Verdict::Errored),
                outcome(5, Verdict::Unavailable),
                outcome(2, Verdict::Available),
            ],
        );

        assert_eq!(ids(&report), vec![2, 7, 5, 9, 1, 4]);
        let statuses: Vec<Verdict> = report.results.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                Verdict::Available,
                Verdict::Available,
                Verdict::Unavailable,
                Verdict::Unavailable,
                Verdict::Errored,
                Verdict::Errored,
            ]
        );
    }

    #[test]
    fn test_order_independent_of_input_order() {
        let forward: Vec<ProbeOutcome> = (1..=6)
            .map(|id| {
                let status = match id % 3 {
                    0 => Verdict::Available,
                    1 => Verdict::Unavailable,
                    _ => Verdict::Errored,
                };
                outcome(id, status)
            })
            .collect();
        let mut backward = forward.clone();
        backward.reverse();

        let now = Utc::now();
        assert_eq!(
            Reporter::build(now, forward).results,
            Reporter::build(now, backward).results
        );
    }

    #[test]
    fn test_empty_report() {
        let report = Reporter::build(Utc::now(), Vec::new());
        assert!(report.is_empty());
        assert_eq!(Reporter::summary(0, 0).to_string(), "0/0");
    }
}
