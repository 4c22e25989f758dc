//! Saving command handlers.

use crate::args::{AddSavingArgs, DateRangeArgs, SavingIdArgs, UpdateSavingArgs};
use crate::commands::{count_noun, positive, Out, Status};
use crate::db::Change;
use crate::model::{parse_date, DateRange, NewSaving, Saving};
use crate::tenant::TenantId;
use crate::{Config, Result};

/// Records a saving. The source is normalized onto the vocabulary's saving sources.
///
/// # Errors
/// - `Validation` if the date is malformed or the amount is not positive. Nothing is written.
/// - `Config` if the vocabulary cannot be loaded.
pub async fn add_saving(
    config: &Config,
    tenant: &TenantId,
    args: AddSavingArgs,
) -> Result<Out<Saving>> {
    let date = parse_date("date", &args.date)?;
    let amount = positive("amount", args.amount)?;
    let source = config
        .vocabulary()
        .load()
        .await?
        .normalize_saving_source(&args.source);

    let saving = config
        .ledger(tenant)
        .await?
        .insert_saving(NewSaving {
            date,
            amount,
            source,
            note: args.note,
        })
        .await?;
    let message = format!(
        "Added saving {} of {} from {}",
        saving.id, saving.amount, saving.source
    );
    Ok(Out::new(message, saving))
}

/// Lists savings newest first, optionally restricted to an inclusive date range.
pub async fn list_savings(
    config: &Config,
    tenant: &TenantId,
    args: DateRangeArgs,
) -> Result<Out<Vec<Saving>>> {
    let range = DateRange::parse(args.start_date.as_deref(), args.end_date.as_deref())?;
    let savings = config.ledger(tenant).await?.list_savings(range).await?;
    Ok(Out::new(
        format!("Found {}", count_noun(savings.len(), "saving")),
        savings,
    ))
}

/// Changes the supplied fields of a saving and leaves the rest untouched. A new source is
/// normalized onto the vocabulary.
pub async fn update_saving(
    config: &Config,
    tenant: &TenantId,
    args: UpdateSavingArgs,
) -> Result<Out<Saving>> {
    let id = args.saving_id;
    let updates = args.updates;
    if updates.is_empty() {
        return Ok(Out::with_status(
            Status::NoChanges,
            format!("No fields to update for saving {id}"),
        ));
    }

    let date = updates
        .date
        .as_deref()
        .map(|d| parse_date("date", d))
        .transpose()?;
    let amount = updates
        .amount
        .map(|a| positive("amount", a))
        .transpose()?;
    let source = match updates.source.as_deref() {
        Some(raw) => Some(
            config
                .vocabulary()
                .load()
                .await?
                .normalize_saving_source(raw),
        ),
        None => None,
    };
    let note = updates.note;

    let change = config
        .ledger(tenant)
        .await?
        .update_saving(id, move |saving| {
            if let Some(date) = date {
                saving.date = date;
            }
            if let Some(amount) = amount {
                saving.amount = amount;
            }
            if let Some(source) = source {
                saving.source = source;
            }
            if let Some(note) = note {
                saving.note = note;
            }
            Ok(())
        })
        .await?;

    Ok(match change {
        Change::Updated(saving) => Out::new(format!("Updated saving {id}"), saving),
        Change::NotFound => Out::with_status(Status::NotFound, format!("Saving {id} not found")),
    })
}

pub async fn delete_saving(
    config: &Config,
    tenant: &TenantId,
    args: SavingIdArgs,
) -> Result<Out<()>> {
    let id = args.saving_id;
    let deleted = config.ledger(tenant).await?.delete_saving(id).await?;
    Ok(if deleted {
        format!("Deleted saving {id}").into()
    } else {
        Out::with_status(Status::NotFound, format!("Saving {id} not found"))
    })
}
