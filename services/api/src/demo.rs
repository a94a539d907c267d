use crate::infra::{build_runtime, token_from_link, SourcingRuntime};
use chrono::{Duration, Local, NaiveDate, TimeZone, Utc};
use clap::Args;
use rust_decimal::Decimal;
use sourcing::config::SourcingConfig;
use sourcing::error::AppError;
use sourcing::workflows::rfq::{
    ComparisonReport, DispatchOutcome, InspectionOutcome, ManualClock, OrderStatus,
    OrderStatusUpdate, PartId, QuoteRequestDraft, QuoteRequestId, QuoteServiceError,
    QuoteSubmission, SupplierId,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Date the demo starts on (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Optional `currency,rate` CSV used instead of the built-in demo rates.
    #[arg(long)]
    pub(crate) rates_csv: Option<PathBuf>,
    /// Print the comparison as JSON instead of a table.
    #[arg(long)]
    pub(crate) json: bool,
}

struct DemoQuote {
    supplier: &'static str,
    unit_price: i64,
    currency: &'static str,
    lead_days: i64,
    payment_terms_days: u32,
}

const DEMO_QUOTES: [DemoQuote; 2] = [
    DemoQuote {
        supplier: "sup-anatolia",
        unit_price: 100,
        currency: "USD",
        lead_days: 14,
        payment_terms_days: 30,
    },
    DemoQuote {
        supplier: "sup-bosphorus",
        unit_price: 9000,
        currency: "TRY",
        lead_days: 10,
        payment_terms_days: 0,
    },
];

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let start = Utc.from_utc_datetime(&today.and_hms_opt(9, 0, 0).unwrap_or_default());
    let clock = Arc::new(ManualClock::at(start));

    let config = SourcingConfig {
        rates_csv: args.rates_csv.clone(),
        ..SourcingConfig::default()
    };
    let runtime = build_runtime(&config, clock.clone())?;
    if args.rates_csv.is_none() {
        runtime.rates.publish(
            vec![
                ("USD".to_string(), Decimal::from(33)),
                ("EUR".to_string(), Decimal::from(36)),
            ],
            start,
        )?;
    }

    println!("Part sourcing demo");
    println!("Start date: {today}");

    let overview = runtime.service.create_request(QuoteRequestDraft {
        part_id: PartId::new("part-housing"),
        supplier_ids: DEMO_QUOTES
            .iter()
            .map(|quote| SupplierId::new(quote.supplier))
            .collect(),
        manufacturing_method: "3002".to_string(),
        deadline: today + Duration::days(7),
        notes: Some("Demo request".to_string()),
    })?;
    let request_id = overview.request.id.clone();
    println!(
        "\nRequest {} created for {} supplier(s), deadline {} ({})",
        request_id,
        overview.invited_count,
        overview.request.deadline,
        overview.status.label()
    );

    let report = runtime.service.dispatch_invitations(&request_id, None)?;
    println!("\nInvitations");
    for outcome in &report.outcomes {
        match outcome {
            DispatchOutcome::Sent { supplier_id } => println!("  {supplier_id}: sent"),
            DispatchOutcome::Failed {
                supplier_id,
                reason,
            } => println!("  {supplier_id}: failed ({reason})"),
        }
    }

    println!("\nQuotes");
    for quote in &DEMO_QUOTES {
        submit_demo_quote(&runtime, &request_id, quote, today)?;
        println!(
            "  {}: {} {} / {} days / {} day terms",
            quote.supplier,
            quote.unit_price,
            quote.currency,
            quote.lead_days,
            quote.payment_terms_days
        );
    }

    let comparison = runtime.service.compare(&request_id)?;
    if args.json {
        match serde_json::to_string_pretty(&comparison) {
            Ok(json) => println!("\n{json}"),
            Err(err) => println!("\nComparison payload unavailable: {err}"),
        }
    } else {
        render_comparison(&comparison);
    }

    let Some(winner) = comparison.entries.first() else {
        println!("\nNo quotes to approve");
        return Ok(());
    };
    let order = runtime.service.approve(&request_id, &winner.response_id)?;
    println!(
        "\nApproved {} -> order {} ({} {} for {} unit(s), due {})",
        winner.supplier_id,
        order.code,
        order.total_price,
        order.currency,
        order.quantity,
        order.expected_delivery
    );
    match runtime.service.approve(&request_id, &winner.response_id) {
        Err(QuoteServiceError::AlreadyApproved(existing)) => {
            println!("  Second approval refused; existing order {}", existing.code)
        }
        other => println!("  Unexpected second approval result: {other:?}"),
    }

    clock.advance(Duration::days(winner.delivery_date.signed_duration_since(today).num_days()));
    runtime.service.update_order_status(
        &order.id,
        OrderStatusUpdate {
            status: OrderStatus::Delivered,
            actual_delivery: Some(winner.delivery_date),
            inspection: Some(InspectionOutcome::Accepted),
        },
    )?;
    let performance = runtime.service.supplier_performance(&winner.supplier_id)?;
    println!(
        "\nSupplier {} after delivery ({} order(s))",
        performance.supplier_id, performance.total_orders
    );
    println!(
        "  delivery {:.1}, quality {:.1}, price {:.1}, payment {:.1}, total {:.1}",
        performance.delivery_score,
        performance.quality_score,
        performance.price_score,
        performance.payment_score,
        performance.total_score
    );

    Ok(())
}

fn submit_demo_quote(
    runtime: &SourcingRuntime,
    request_id: &QuoteRequestId,
    quote: &DemoQuote,
    today: NaiveDate,
) -> Result<(), AppError> {
    let supplier_id = SupplierId::new(quote.supplier);
    let link = runtime
        .outbox
        .latest_link(&supplier_id)
        .ok_or(QuoteServiceError::NotFound("invitation"))?;
    let token = token_from_link(&link).unwrap_or_default();

    runtime.service.public_form(request_id, &supplier_id, token)?;
    runtime.service.submit_response(
        request_id,
        &supplier_id,
        token,
        QuoteSubmission {
            unit_price: Decimal::from(quote.unit_price),
            currency: quote.currency.to_string(),
            delivery_date: today + Duration::days(quote.lead_days),
            payment_terms_days: quote.payment_terms_days,
            notes: None,
        },
    )?;
    Ok(())
}

fn render_comparison(comparison: &ComparisonReport) {
    println!(
        "\nComparison ({} base, rate snapshot v{}, status {})",
        comparison.base_currency,
        comparison.rate_snapshot_version,
        comparison.status.label()
    );
    for entry in &comparison.entries {
        let name = entry
            .supplier_name
            .as_deref()
            .unwrap_or(entry.supplier_id.as_str());
        println!(
            "  #{} {:<20} total {:>3} | {} {}",
            entry.rank, name, entry.total, entry.normalized_price, comparison.base_currency
        );
        println!(
            "      price {:>5.2} delivery {:>5.2} quality {:>5.2} payment {:>5.2}",
            entry.scores.price,
            entry.scores.delivery,
            entry.scores.quality,
            entry.scores.payment
        );
    }
}
