//! Report generation service.

use chrono::{DateTime, Datelike, Utc};
use edumart_shared::types::{Currency, UserId};

use super::error::ReportError;
use super::types::{CurrencyTaxSummary, EarningRow, PayoutRow, TaxDocument, TaxFigures, TaxMonth};
use crate::earnings::EarningStatus;
use crate::payout::PayoutStatus;

/// Earliest year a tax document can be requested for.
pub const FIRST_TAX_YEAR: i32 = 2000;

/// Service for generating instructor reports.
pub struct ReportService;

impl ReportService {
    /// Builds the annual tax document.
    ///
    /// Earnings count in the month they were created. Payouts count in the
    /// month they completed, falling back to the request time. Rows outside
    /// `year` are ignored.
    ///
    /// # Errors
    ///
    /// Returns `ReportError::InvalidYear` for a year before 2000 or after the
    /// generation year.
    pub fn tax_document(
        instructor_id: UserId,
        year: i32,
        earnings: &[EarningRow],
        payouts: &[PayoutRow],
        generated_at: DateTime<Utc>,
    ) -> Result<TaxDocument, ReportError> {
        if !(FIRST_TAX_YEAR..=generated_at.year()).contains(&year) {
            return Err(ReportError::InvalidYear(year));
        }

        let mut grid: Vec<(Currency, [TaxFigures; 12], bool)> = Currency::ALL
            .iter()
            .map(|c| (*c, [TaxFigures::default(); 12], false))
            .collect();

        for earning in earnings.iter().filter(|e| e.created_at.year() == year) {
            let Some(slot) = Self::slot(&mut grid, earning.currency, earning.created_at) else {
                continue;
            };
            if earning.status == EarningStatus::Cancelled {
                slot.cancelled_commission += earning.commission;
            } else {
                slot.gross_sales += earning.gross;
                slot.platform_fees += earning.platform_fee;
                slot.net_commission += earning.commission;
            }
        }

        for payout in payouts
            .iter()
            .filter(|p| p.status == PayoutStatus::Completed)
        {
            let at = payout.processed_at.unwrap_or(payout.requested_at);
            if at.year() != year {
                continue;
            }
            if let Some(slot) = Self::slot(&mut grid, payout.currency, at) {
                slot.completed_payouts += payout.amount;
            }
        }

        let currencies = grid
            .into_iter()
            .filter(|(_, _, touched)| *touched)
            .map(|(currency, months, _)| {
                let mut totals = TaxFigures::default();
                let months = months
                    .iter()
                    .zip(1_u32..)
                    .map(|(figures, month)| {
                        totals.absorb(figures);
                        TaxMonth {
                            month,
                            figures: *figures,
                        }
                    })
                    .collect();
                CurrencyTaxSummary {
                    currency,
                    totals,
                    months,
                }
            })
            .collect();

        Ok(TaxDocument {
            instructor_id,
            year,
            currencies,
            generated_at,
        })
    }

    fn slot(
        grid: &mut [(Currency, [TaxFigures; 12], bool)],
        currency: Currency,
        at: DateTime<Utc>,
    ) -> Option<&mut TaxFigures> {
        let (_, months, touched) = grid.iter_mut().find(|(c, _, _)| *c == currency)?;
        *touched = true;
        months.get_mut(usize::try_from(at.month0()).ok()?)
    }
}
