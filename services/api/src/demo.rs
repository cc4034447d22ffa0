use crate::infra::{seed_candidates, InMemoryPresentationHost, InMemoryScoringBackend};
use applicant_review::error::AppError;
use applicant_review::review::{
    AssessmentModel, CandidateId, Criterion, OverrideController, OverrideError, RegionType,
    ScoringBackend,
};
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ScorecardArgs {
    /// Candidate to render (one of the seeded demo ids, e.g. cand-001)
    #[arg(long)]
    pub(crate) candidate: String,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Candidate to run the walkthrough against (defaults to cand-001)
    #[arg(long)]
    pub(crate) candidate: Option<String>,
    /// Leave the override in place instead of resetting it at the end
    #[arg(long)]
    pub(crate) keep_override: bool,
}

pub(crate) fn run_scorecard(args: ScorecardArgs) -> Result<(), AppError> {
    let backend = InMemoryScoringBackend::default();
    seed_candidates(&backend);

    let candidate = CandidateId(args.candidate);
    let model = backend
        .get_assessment(&candidate)
        .map_err(OverrideError::from)?;
    print_scorecard(&model);
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let candidate = CandidateId(args.candidate.unwrap_or_else(|| "cand-001".to_string()));

    let backend = Arc::new(InMemoryScoringBackend::default());
    seed_candidates(&backend);
    let host = Arc::new(InMemoryPresentationHost::default());
    for region in RegionType::ALL {
        host.mount(&candidate, region);
    }
    let mut controller = OverrideController::new(backend, host.clone());

    println!("Override and reconciliation demo for {candidate}");
    let opening = controller
        .open_candidate(&candidate)
        .map_err(OverrideError::from)?;
    print_scorecard(&opening);

    println!("\nOpening an edit session on education");
    let session = controller.begin_edit(&candidate, Criterion::Education)?;
    println!(
        "- pre-filled with effective value {} (prior justification: {})",
        session.draft_value,
        if session.draft_reason.is_empty() {
            "none"
        } else {
            session.draft_reason.as_str()
        }
    );

    let outcome = controller.save(
        &candidate,
        Criterion::Education,
        35.0,
        "Verified original transcripts and accreditation",
    )?;
    report_outcome("Saved override education -> 35", &outcome);
    print_region_totals(&host, &candidate);

    let outcome = controller.update_potential(&candidate, 12.0)?;
    report_outcome("Updated potential -> 12", &outcome);
    print_region_totals(&host, &candidate);

    if args.keep_override {
        println!("\nLeaving the override in place (--keep-override)");
        return Ok(());
    }

    println!("\nResetting the education override");
    let prompt = controller.request_reset(&candidate, Criterion::Education)?;
    println!(
        "- confirm discarding effective value {} (override active: {})",
        prompt.effective_value, prompt.overridden
    );
    let outcome = controller.confirm_reset(&candidate, Criterion::Education)?;
    report_outcome("Restored the system score", &outcome);
    print_region_totals(&host, &candidate);

    Ok(())
}

fn report_outcome(headline: &str, outcome: &applicant_review::review::MutationOutcome) {
    println!("\n{headline}");
    match (&outcome.refreshed, &outcome.warning) {
        (Some(model), _) => println!(
            "- rule-based total {} | AI-enhanced total {:.1}",
            model.rule_based_total(),
            model.ai_enhanced_total
        ),
        (None, Some(warning)) => {
            println!("- saved, but the refresh failed: {}", warning.detail)
        }
        (None, None) => {}
    }
}

fn print_scorecard(model: &AssessmentModel) {
    let view = model.view();
    println!(
        "Scorecard: rule-based {}/100 | AI-enhanced {:.1}/100 | potential {}/15",
        view.rule_based_total, view.ai_enhanced_total, view.potential
    );
    for row in &view.criteria {
        let override_note = match &row.override_reason {
            Some(reason) => format!(" [override: {reason}]"),
            None => String::new(),
        };
        println!(
            "- {}: {}/{} ({}, {:.1}%){}",
            row.label,
            row.effective_value,
            row.max_points,
            row.badge.tier.label(),
            row.badge.fill_percent,
            override_note
        );
    }
}

fn print_region_totals(host: &InMemoryPresentationHost, candidate: &CandidateId) {
    println!("Mounted regions after reconciliation:");
    for region in RegionType::ALL {
        match host.frame(candidate, region) {
            Some(frame) => println!(
                "- {}: rule-based {} | AI-enhanced {:.1}",
                region.label(),
                frame.rule_based.value,
                frame.ai_enhanced.value
            ),
            None => println!("- {}: not mounted", region.label()),
        }
    }
}
