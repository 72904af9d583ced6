use serde::{Deserialize, Serialize};

use super::types::{ForecastStage, LeadRecord, SalesForecast, Stage};

/// Close probability applied to each open pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastWeights {
    pub first_contact: f64,
    pub qualification: f64,
    pub proposal: f64,
    pub negotiation: f64,
}

impl Default for ForecastWeights {
    fn default() -> Self {
        Self {
            first_contact: 0.05,
            qualification: 0.25,
            proposal: 0.50,
            negotiation: 0.75,
        }
    }
}

impl ForecastWeights {
    pub fn lowest(&self) -> f64 {
        [self.qualification, self.proposal, self.negotiation]
            .into_iter()
            .fold(self.first_contact, f64::min)
    }

    /// Weight for an open stage. Terminal stages are not part of the pipeline.
    pub fn weight_for(&self, stage: &Stage) -> Option<f64> {
        match stage {
            Stage::FirstContact => Some(self.first_contact),
            Stage::Qualification => Some(self.qualification),
            Stage::Proposal => Some(self.proposal),
            Stage::Negotiation => Some(self.negotiation),
            Stage::Won | Stage::Lost => None,
            Stage::Other(_) => Some(self.lowest()),
        }
    }
}

pub fn forecast(leads: &[LeadRecord], weights: &ForecastWeights) -> SalesForecast {
    let mut stages: Vec<ForecastStage> = Vec::new();

    for lead in leads {
        let Some(weight) = weights.weight_for(&lead.stage) else {
            continue;
        };
        match stages.iter_mut().find(|s| s.stage == lead.stage) {
            Some(entry) => {
                entry.count += 1;
                entry.value += lead.value;
                entry.weighted_value += lead.value * weight;
            }
            None => stages.push(ForecastStage {
                stage: lead.stage.clone(),
                count: 1,
                value: lead.value,
                weight,
                weighted_value: lead.value * weight,
            }),
        }
    }

    stages.sort_by(|a, b| a.stage.sort_key().cmp(&b.stage.sort_key()));

    SalesForecast {
        forecasted_value_weighted: stages.iter().map(|s| s.weighted_value).sum(),
        total_pipeline_value: stages.iter().map(|s| s.value).sum(),
        stages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn lead(stage: &str, value: f64) -> LeadRecord {
        let now = Utc::now();
        LeadRecord {
            id: Uuid::new_v4(),
            name: "Lead".to_string(),
            company: None,
            email: None,
            phone: None,
            stage: Stage::parse(stage),
            value,
            source: None,
            owner_id: None,
            owner_name: None,
            lost_reason: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_empty_pipeline() {
        let result = forecast(&[], &ForecastWeights::default());
        assert_eq!(result.forecasted_value_weighted, 0.0);
        assert_eq!(result.total_pipeline_value, 0.0);
        assert!(result.stages.is_empty());
    }

    #[test]
    fn test_terminal_stages_excluded() {
        let leads = vec![
            lead("Won", 1000.0),
            lead("Lost", 400.0),
            lead("Proposal", 500.0),
            lead("Proposal", 500.0),
            lead("Negotiation", 1000.0),
            lead("Negotiation", 1000.0),
        ];
        let result = forecast(&leads, &ForecastWeights::default());
        assert!((result.forecasted_value_weighted - 2000.0).abs() < 1e-9);
        assert!((result.total_pipeline_value - 3000.0).abs() < 1e-9);

        let stages: Vec<&str> = result.stages.iter().map(|s| s.stage.label()).collect();
        assert_eq!(stages, vec!["Proposal", "Negotiation"]);
        assert_eq!(result.stages[0].count, 2);
        assert!((result.stages[1].weighted_value - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_stage_uses_lowest_weight() {
        let weights = ForecastWeights {
            first_contact: 0.2,
            qualification: 0.1,
            proposal: 0.5,
            negotiation: 0.9,
        };
        assert_eq!(weights.lowest(), 0.1);

        let result = forecast(&[lead("Demo Scheduled", 100.0), lead("new", 100.0)], &weights);
        assert!((result.forecasted_value_weighted - 30.0).abs() < 1e-9);
        assert_eq!(result.stages[0].stage, Stage::FirstContact);
        assert_eq!(result.stages[1].weight, 0.1);
    }

    #[test]
    fn test_custom_weights_applied() {
        let weights = ForecastWeights {
            proposal: 1.0,
            ..Default::default()
        };
        let result = forecast(&[lead("Proposal", 250.0)], &weights);
        assert!((result.forecasted_value_weighted - 250.0).abs() < 1e-9);
    }
}
