//! Gateway metrics registry.
//!
//! Counters and a latency histogram keyed by dynamic labels in a `DashMap`.
//! Label pairs are sorted before use so `[(a, 1), (b, 2)]` and
//! `[(b, 2), (a, 1)]` land on the same series. Histogram buckets are integer
//! microseconds.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

type LabelKey = Vec<(String, String)>;

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn render_labels(key: &LabelKey, extra: Option<(&str, &str)>) -> String {
    let escape = |v: &str| v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n");
    let mut parts: Vec<String> = key
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", escape(v)))
        .collect();
    if let Some((k, v)) = extra {
        parts.push(format!("{k}=\"{v}\""));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", parts.join(","))
    }
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.map
            .entry(label_key(labels))
            .or_default()
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} counter");
        for r in self.map.iter() {
            let _ = writeln!(
                out,
                "{name}{} {}",
                render_labels(r.key(), None),
                r.value().load(Ordering::Relaxed)
            );
        }
    }
}

// 10us .. 10ms; a decision is one regex scan plus one AEAD open.
const BUCKETS_MICROS: [u64; 7] = [10, 50, 100, 250, 500, 1_000, 10_000];

#[derive(Default)]
struct Histogram {
    count: AtomicU64,
    sum: AtomicU64,
    buckets: [AtomicU64; BUCKETS_MICROS.len()],
}

#[derive(Default)]
pub struct HistogramVec {
    map: DashMap<LabelKey, Histogram>,
}

impl HistogramVec {
    pub fn observe(&self, labels: &[(&str, &str)], elapsed: Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        let hist = self.map.entry(label_key(labels)).or_default();

        hist.count.fetch_add(1, Ordering::Relaxed);
        hist.sum.fetch_add(micros, Ordering::Relaxed);
        for (bucket, le) in hist.buckets.iter().zip(BUCKETS_MICROS) {
            if micros <= le {
                bucket.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {name} histogram");
        for r in self.map.iter() {
            let (key, hist) = (r.key(), r.value());
            for (bucket, le) in hist.buckets.iter().zip(BUCKETS_MICROS) {
                let le = le.to_string();
                let _ = writeln!(
                    out,
                    "{name}_bucket{} {}",
                    render_labels(key, Some(("le", le.as_str()))),
                    bucket.load(Ordering::Relaxed)
                );
            }
            let count = hist.count.load(Ordering::Relaxed);
            let _ = writeln!(out, "{name}_bucket{} {count}", render_labels(key, Some(("le", "+Inf"))));
            let _ = writeln!(out, "{name}_sum{} {}", render_labels(key, None), hist.sum.load(Ordering::Relaxed));
            let _ = writeln!(out, "{name}_count{} {count}", render_labels(key, None));
        }
    }
}

#[derive(Default)]
pub struct GatewayMetrics {
    /// labels: outcome, reason
    pub decisions: CounterVec,
    /// labels: result
    pub logins: CounterVec,
    pub decision_duration: HistogramVec,
    draining: AtomicBool,
}

impl GatewayMetrics {
    pub fn set_draining(&self) {
        self.draining.store(true, Ordering::Relaxed);
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Relaxed)
    }

    /// Prometheus text exposition, plus caller-supplied gauges.
    pub fn render(&self, extra: &[(&str, u64)]) -> String {
        let mut out = String::new();
        self.decisions.render("authgate_decisions_total", &mut out);
        self.logins.render("authgate_logins_total", &mut out);
        self.decision_duration
            .render("authgate_decision_duration_micros", &mut out);

        let _ = writeln!(
            out,
            "# TYPE authgate_draining gauge\nauthgate_draining {}",
            u8::from(self.is_draining())
        );
        for (k, v) in extra {
            let _ = writeln!(out, "{k} {v}");
        }
        out
    }
}
