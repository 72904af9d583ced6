use std::collections::HashMap;
use uuid::Uuid;

use super::types::{
    FunnelStage, LeadRecord, LostReasonShare, LostReasonsAnalysis, ProductivityMetrics,
    SellerProductivity, Stage,
};

pub const UNSPECIFIED_REASON: &str = "Unspecified";
pub const UNASSIGNED_SELLER: &str = "Unassigned";

const SECONDS_PER_DAY: f64 = 86_400.0;

/// `part / whole`, or 0 for an empty base.
pub fn ratio(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[derive(Default)]
struct Tally {
    total: i64,
    active: i64,
    won: i64,
    won_value: f64,
    lost: i64,
}

impl Tally {
    fn add(&mut self, lead: &LeadRecord) {
        self.total += 1;
        match lead.stage {
            Stage::Won => {
                self.won += 1;
                self.won_value += lead.value;
            }
            Stage::Lost => self.lost += 1,
            _ => self.active += 1,
        }
    }
}

pub fn productivity(leads: &[LeadRecord]) -> ProductivityMetrics {
    let mut tally = Tally::default();
    let mut closing_days = 0.0;

    for lead in leads {
        tally.add(lead);
        if lead.stage == Stage::Won {
            let elapsed = lead.updated_at - lead.created_at;
            closing_days += elapsed.num_seconds() as f64 / SECONDS_PER_DAY;
        }
    }

    let avg_closing_time_days = if tally.won > 0 {
        closing_days / tally.won as f64
    } else {
        0.0
    };

    ProductivityMetrics {
        total_leads: tally.total,
        leads_active: tally.active,
        total_won_count: tally.won,
        total_won_value: tally.won_value,
        avg_closing_time_days,
        total_lost_count: tally.lost,
        conversion_rate: ratio(tally.won, tally.total),
        loss_rate: ratio(tally.lost, tally.total),
        sellers: seller_productivity(leads),
    }
}

pub fn seller_productivity(leads: &[LeadRecord]) -> Vec<SellerProductivity> {
    let mut by_seller: HashMap<Option<Uuid>, (Option<&str>, Tally)> = HashMap::new();

    for lead in leads {
        let entry = by_seller
            .entry(lead.owner_id)
            .or_insert_with(|| (None, Tally::default()));
        if entry.0.is_none() {
            entry.0 = lead.owner_name.as_deref();
        }
        entry.1.add(lead);
    }

    let mut sellers: Vec<SellerProductivity> = by_seller
        .into_iter()
        .map(|(seller_id, (name, tally))| SellerProductivity {
            seller_id,
            seller_name: match (seller_id, name) {
                (_, Some(name)) => name.to_string(),
                (Some(id), None) => id.to_string(),
                (None, None) => UNASSIGNED_SELLER.to_string(),
            },
            total_leads: tally.total,
            leads_active: tally.active,
            won_count: tally.won,
            won_value: tally.won_value,
            lost_count: tally.lost,
            conversion_rate: ratio(tally.won, tally.total),
        })
        .collect();

    sellers.sort_by(|a, b| {
        b.won_value
            .total_cmp(&a.won_value)
            .then(b.total_leads.cmp(&a.total_leads))
            .then_with(|| a.seller_name.cmp(&b.seller_name))
    });
    sellers
}

pub fn funnel_stages(leads: &[LeadRecord]) -> Vec<FunnelStage> {
    let mut by_stage: HashMap<&Stage, (i64, f64)> = HashMap::new();
    for lead in leads {
        let entry = by_stage.entry(&lead.stage).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += lead.value;
    }

    let mut stages: Vec<FunnelStage> = by_stage
        .into_iter()
        .map(|(stage, (count, total_value))| FunnelStage {
            stage: stage.clone(),
            count,
            total_value,
        })
        .collect();
    stages.sort_by(|a, b| a.stage.sort_key().cmp(&b.stage.sort_key()));
    stages
}

pub fn normalize_reason(reason: Option<&str>) -> &str {
    match reason.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => UNSPECIFIED_REASON,
    }
}

pub fn lost_reasons(leads: &[LeadRecord]) -> LostReasonsAnalysis {
    let mut by_reason: HashMap<&str, i64> = HashMap::new();
    let mut total_lost_count = 0;

    for lead in leads.iter().filter(|l| l.stage == Stage::Lost) {
        total_lost_count += 1;
        *by_reason
            .entry(normalize_reason(lead.lost_reason.as_deref()))
            .or_insert(0) += 1;
    }

    let mut reasons: Vec<LostReasonShare> = by_reason
        .into_iter()
        .map(|(reason, count)| LostReasonShare {
            reason: reason.to_string(),
            count,
            percentage: ratio(count, total_lost_count),
        })
        .collect();
    reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));

    LostReasonsAnalysis {
        total_lost_count,
        reasons,
    }
}
