use super::views::{MarketDirection, MarketInsights, SegmentBreakdown};

/// Year-over-year price moves inside this band count as a stable market.
const STABLE_BAND: f64 = 0.02;

pub(crate) fn generate_insights(
    breakdown: &SegmentBreakdown,
    year_over_year_available: bool,
) -> MarketInsights {
    let rollup = &breakdown.rollup;
    let comparable = year_over_year_available && rollup.has_data();

    let price_change = if comparable {
        rollup.price_delta.year_over_year
    } else {
        0.0
    };
    let volume_change = if comparable {
        rollup.volume_delta.year_over_year
    } else {
        0.0
    };

    let direction = if !comparable {
        MarketDirection::InsufficientData
    } else if price_change > STABLE_BAND {
        MarketDirection::Rising
    } else if price_change < -STABLE_BAND {
        MarketDirection::Falling
    } else {
        MarketDirection::Stable
    };

    let dominant_segment = breakdown
        .segments
        .first()
        .map(|snapshot| snapshot.bucket.segment.clone());

    let fastest_growing_segment = comparable
        .then(|| {
            breakdown
                .segments
                .iter()
                .filter(|snapshot| snapshot.bucket.has_data())
                .filter(|snapshot| snapshot.bucket.price_delta.year_over_year > 0.0)
                .max_by(|a, b| {
                    a.bucket
                        .price_delta
                        .year_over_year
                        .total_cmp(&b.bucket.price_delta.year_over_year)
                })
                .map(|snapshot| snapshot.bucket.segment.clone())
        })
        .flatten();

    let pro_rated_notice = breakdown.pro_rated.then(|| {
        format!(
            "{} is still being reported; figures will change as late sales arrive",
            breakdown.period.label()
        )
    });

    let mut observations = Vec::new();
    if !rollup.has_data() {
        observations.push(format!("No sales recorded in {}", breakdown.period.label()));
    } else {
        observations.push(format!(
            "{} sales closed in {} at an average of {:.0}",
            rollup.transaction_count,
            breakdown.period.label(),
            rollup.avg_price
        ));
        if comparable {
            observations.push(format!(
                "Average price {} {:.1}% year over year on {} volume",
                if price_change >= 0.0 { "up" } else { "down" },
                price_change.abs() * 100.0,
                if volume_change >= 0.0 { "higher" } else { "lower" }
            ));
        }
        if rollup.sale_to_list_ratio > 1.0 {
            observations.push("Homes are selling above list price on average".to_string());
        }
    }
    if let Some(snapshot) = breakdown.segments.first() {
        observations.push(format!(
            "{} accounts for {:.1}% of sales in the window",
            snapshot.bucket.segment, snapshot.share_percent
        ));
    }

    MarketInsights {
        period: breakdown.period,
        direction,
        direction_label: direction.label(),
        price_change_yoy_pct: price_change * 100.0,
        volume_change_yoy_pct: volume_change * 100.0,
        dominant_segment,
        fastest_growing_segment,
        pro_rated_notice,
        observations,
    }
}
