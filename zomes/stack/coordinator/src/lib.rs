//! Stack Coordinator Zome
//!
//! Provides extern functions for supplement stacks including:
//! - Catalog management (supplements, substances, interactions)
//! - Stack CRUD with soft delete
//! - Intake logging and the daily timeline
//! - Interaction and dosage safety checks
//!
//! Safety checks are advisory and fail-open: a lookup failure yields an
//! empty report and never fails the call.

use hdk::prelude::*;
use stack_integrity::*;
use std::collections::HashSet;
use tracing::warn;
use whatdose_safety::{
    build_timeline, DailyTimeline, DosageCheckItem, LookupError, SafetyEngine, SafetyPolicy, SafetyReport,
    SafetyStore, ScheduleSlot, SubstanceId, SupplementId, TimelineEntry, UNKNOWN_NAME,
};

mod store;

use store::DhtSafetyStore;

// ============================================================================
// Anchor Entry for Indexing
// ============================================================================

/// Anchor entry for creating deterministic entry hashes for indexing
#[hdk_entry_helper]
#[derive(Clone, PartialEq)]
pub struct Anchor(pub String);

/// Create an anchor hash for indexing
fn anchor_hash(anchor_text: &str) -> ExternResult<EntryHash> {
    let anchor = Anchor(anchor_text.to_string());
    hash_entry(&anchor)
}

pub(crate) fn supplement_anchor(id: SupplementId) -> ExternResult<EntryHash> {
    anchor_hash(&format!("supplement_{}", id))
}

pub(crate) fn substance_anchor(id: SubstanceId) -> ExternResult<EntryHash> {
    anchor_hash(&format!("substance_{}", id))
}

fn intake_anchor(agent: &AgentPubKey, date: &str) -> ExternResult<EntryHash> {
    anchor_hash(&format!("intake_{}_{}", agent, date))
}

fn guest_error(message: impl Into<String>) -> WasmError {
    wasm_error!(WasmErrorInner::Guest(message.into()))
}

/// Follow links and fetch every target record that still resolves
pub(crate) fn records_from_links(
    base: impl Into<AnyLinkableHash>,
    link_type: LinkTypes,
) -> ExternResult<Vec<Record>> {
    let links = get_links(LinkQuery::try_new(base, link_type)?, GetStrategy::default())?;

    let mut records = Vec::new();
    for link in links {
        if let Some(hash) = link.target.into_action_hash() {
            if let Some(record) = get(hash, GetOptions::default())? {
                records.push(record);
            }
        }
    }

    Ok(records)
}

// ============================================================================
// Catalog Functions
// ============================================================================

/// Catalog entry for a supplement id, if one exists
pub(crate) fn find_supplement(id: SupplementId) -> ExternResult<Option<(Record, Supplement)>> {
    for record in records_from_links(supplement_anchor(id)?, LinkTypes::SupplementIdToSupplement)? {
        if let Some(supplement) = record.entry().to_app_option::<Supplement>().ok().flatten() {
            return Ok(Some((record, supplement)));
        }
    }
    Ok(None)
}

/// Catalog entry for a substance id, if one exists
pub(crate) fn find_substance(id: SubstanceId) -> ExternResult<Option<Substance>> {
    for record in records_from_links(substance_anchor(id)?, LinkTypes::SubstanceIdToSubstance)? {
        if let Some(substance) = record.entry().to_app_option::<Substance>().ok().flatten() {
            return Ok(Some(substance));
        }
    }
    Ok(None)
}

/// Add a supplement to the catalog
#[hdk_extern]
pub fn create_supplement(supplement: Supplement) -> ExternResult<Record> {
    if find_supplement(supplement.supplement_id)?.is_some() {
        return Err(guest_error(format!(
            "Supplement {} already exists",
            supplement.supplement_id
        )));
    }

    let action_hash = create_entry(&EntryTypes::Supplement(supplement.clone()))?;

    create_link(
        supplement_anchor(supplement.supplement_id)?,
        action_hash.clone(),
        LinkTypes::SupplementIdToSupplement,
        (),
    )?;

    let all_anchor = anchor_hash("all_supplements")?;
    create_link(all_anchor, action_hash.clone(), LinkTypes::AllSupplements, ())?;

    get(action_hash, GetOptions::default())?
        .ok_or(guest_error("Failed to get created supplement"))
}

/// Get a supplement by catalog id
#[hdk_extern]
pub fn get_supplement(id: SupplementId) -> ExternResult<Option<Record>> {
    Ok(find_supplement(id)?.map(|(record, _)| record))
}

/// Get the whole supplement catalog
#[hdk_extern]
pub fn get_all_supplements(_: ()) -> ExternResult<Vec<Record>> {
    records_from_links(anchor_hash("all_supplements")?, LinkTypes::AllSupplements)
}

/// Add a substance to the catalog
#[hdk_extern]
pub fn create_substance(substance: Substance) -> ExternResult<Record> {
    if find_substance(substance.substance_id)?.is_some() {
        return Err(guest_error(format!(
            "Substance {} already exists",
            substance.substance_id
        )));
    }

    let action_hash = create_entry(&EntryTypes::Substance(substance.clone()))?;

    create_link(
        substance_anchor(substance.substance_id)?,
        action_hash.clone(),
        LinkTypes::SubstanceIdToSubstance,
        (),
    )?;

    get(action_hash, GetOptions::default())?
        .ok_or(guest_error("Failed to get created substance"))
}

/// Record that a supplement contains a substance
#[hdk_extern]
pub fn map_supplement_substance(mapping: SupplementSubstance) -> ExternResult<Record> {
    if find_supplement(mapping.supplement_id)?.is_none() {
        return Err(guest_error(format!("Unknown supplement {}", mapping.supplement_id)));
    }
    if find_substance(mapping.substance_id)?.is_none() {
        return Err(guest_error(format!("Unknown substance {}", mapping.substance_id)));
    }

    let action_hash = create_entry(&EntryTypes::SupplementSubstance(mapping.clone()))?;

    create_link(
        supplement_anchor(mapping.supplement_id)?,
        action_hash.clone(),
        LinkTypes::SupplementToSubstances,
        (),
    )?;

    get(action_hash, GetOptions::default())?
        .ok_or(guest_error("Failed to get created mapping"))
}

/// Add a substance interaction, reachable from both substances
#[hdk_extern]
pub fn create_substance_interaction(interaction: SubstanceInteraction) -> ExternResult<Record> {
    let action_hash = create_entry(&EntryTypes::SubstanceInteraction(interaction.clone()))?;

    create_link(
        substance_anchor(interaction.substance_a)?,
        action_hash.clone(),
        LinkTypes::SubstanceToInteractions,
        (),
    )?;
    create_link(
        substance_anchor(interaction.substance_b)?,
        action_hash.clone(),
        LinkTypes::SubstanceToInteractions,
        (),
    )?;

    get(action_hash, GetOptions::default())?
        .ok_or(guest_error("Failed to get created interaction"))
}

// ============================================================================
// Stack Functions
// ============================================================================

/// A stack item with the hashes needed to edit it
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StackItemView {
    /// Stable identity of the item across updates
    pub original_hash: ActionHash,
    pub latest_hash: ActionHash,
    pub item: StackItem,
}

/// Newest update by link timestamp, or the original when never updated
fn latest_version(
    original_hash: &ActionHash,
    updates: impl IntoIterator<Item = (Timestamp, ActionHash)>,
) -> ActionHash {
    updates
        .into_iter()
        .max_by_key(|(timestamp, _)| *timestamp)
        .map(|(_, hash)| hash)
        .unwrap_or_else(|| original_hash.clone())
}

/// Walk update actions back to the create that identifies a stack item
fn original_stack_item_hash(hash: &ActionHash) -> ExternResult<ActionHash> {
    let mut current = hash.clone();
    loop {
        let record = get(current.clone(), GetOptions::default())?
            .ok_or(guest_error("Stack item not found"))?;
        match record.action() {
            Action::Update(update) => current = update.original_action_address.clone(),
            _ => return Ok(current),
        }
    }
}

/// Latest version of a stack item, following update links
fn latest_stack_item(original_hash: &ActionHash) -> ExternResult<StackItemView> {
    let links = get_links(
        LinkQuery::try_new(original_hash.clone(), LinkTypes::StackItemUpdates)?,
        GetStrategy::default(),
    )?;

    let latest_hash = latest_version(
        original_hash,
        links
            .into_iter()
            .filter_map(|link| link.target.into_action_hash().map(|hash| (link.timestamp, hash))),
    );

    let record = get(latest_hash.clone(), GetOptions::default())?
        .ok_or(guest_error("Stack item not found"))?;

    let item: StackItem = record
        .entry()
        .to_app_option()
        .map_err(|e| guest_error(e.to_string()))?
        .ok_or(guest_error("Invalid stack item entry"))?;

    Ok(StackItemView {
        original_hash: original_hash.clone(),
        latest_hash,
        item,
    })
}

/// Caller's own stack item by any of its version hashes; anyone else's is rejected
fn my_stack_item(hash: &ActionHash) -> ExternResult<StackItemView> {
    let view = latest_stack_item(&original_stack_item_hash(hash)?)?;
    if view.item.owner != agent_info()?.agent_initial_pubkey {
        return Err(guest_error("Only the owner can change a stack item"));
    }
    Ok(view)
}

/// Write a new version of a stack item and link it from the original
fn write_stack_update(view: StackItemView, mut item: StackItem) -> ExternResult<Record> {
    item.updated_at = sys_time()?;

    let updated_hash = update_entry(view.latest_hash, &item)?;
    create_link(
        view.original_hash,
        updated_hash.clone(),
        LinkTypes::StackItemUpdates,
        (),
    )?;

    get(updated_hash, GetOptions::default())?
        .ok_or(guest_error("Failed to get updated stack item"))
}

/// All of the caller's stack items, including removed ones when asked
fn my_stack(include_inactive: bool) -> ExternResult<Vec<StackItemView>> {
    let me = agent_info()?.agent_initial_pubkey;
    let links = get_links(
        LinkQuery::try_new(me, LinkTypes::AgentToStackItems)?,
        GetStrategy::default(),
    )?;

    let mut items = Vec::new();
    for link in links {
        if let Some(original_hash) = link.target.into_action_hash() {
            items.push(latest_stack_item(&original_hash)?);
        }
    }

    Ok(visible_items(items, include_inactive))
}

/// Removed items stay on the chain but drop out of the stack
fn visible_items(items: Vec<StackItemView>, include_inactive: bool) -> Vec<StackItemView> {
    items
        .into_iter()
        .filter(|view| include_inactive || view.item.active)
        .collect()
}

fn already_stacked(items: &[StackItemView], supplement_id: SupplementId) -> bool {
    items
        .iter()
        .any(|view| view.item.active && view.item.supplement_id == supplement_id)
}

/// Input for adding a supplement to the caller's stack
#[derive(Serialize, Deserialize, Debug)]
pub struct AddToStackInput {
    pub supplement_id: SupplementId,
    pub schedule: ScheduleSlot,
    pub custom_dosage: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

/// Add a supplement to the caller's stack
#[hdk_extern]
pub fn add_to_stack(input: AddToStackInput) -> ExternResult<Record> {
    if find_supplement(input.supplement_id)?.is_none() {
        return Err(guest_error(format!("Unknown supplement {}", input.supplement_id)));
    }

    if already_stacked(&my_stack(false)?, input.supplement_id) {
        return Err(guest_error("Supplement is already in your stack"));
    }

    let me = agent_info()?.agent_initial_pubkey;
    let now = sys_time()?;
    let item = StackItem {
        owner: me.clone(),
        supplement_id: input.supplement_id,
        schedule: input.schedule,
        custom_dosage: input.custom_dosage,
        unit: input.unit,
        notes: input.notes,
        active: true,
        created_at: now,
        updated_at: now,
    };

    let action_hash = create_entry(&EntryTypes::StackItem(item))?;
    create_link(me, action_hash.clone(), LinkTypes::AgentToStackItems, ())?;

    get(action_hash, GetOptions::default())?
        .ok_or(guest_error("Failed to get created stack item"))
}

/// Input for editing a stack item's timing or dosage
#[derive(Serialize, Deserialize, Debug)]
pub struct UpdateStackItemInput {
    pub original_hash: ActionHash,
    pub schedule: ScheduleSlot,
    pub custom_dosage: Option<f64>,
    pub unit: Option<String>,
    pub notes: Option<String>,
}

/// Change the timing or dosage of a stack item
#[hdk_extern]
pub fn update_stack_item(input: UpdateStackItemInput) -> ExternResult<Record> {
    let view = my_stack_item(&input.original_hash)?;
    if !view.item.active {
        return Err(guest_error("Cannot edit a removed stack item"));
    }

    let mut item = view.item.clone();
    item.schedule = input.schedule;
    item.custom_dosage = input.custom_dosage;
    item.unit = input.unit;
    item.notes = input.notes;

    write_stack_update(view, item)
}

/// Remove a supplement from the stack (soft delete)
#[hdk_extern]
pub fn remove_from_stack(original_hash: ActionHash) -> ExternResult<Record> {
    let view = my_stack_item(&original_hash)?;
    if !view.item.active {
        return Err(guest_error("Stack item is already removed"));
    }

    let mut item = view.item.clone();
    item.active = false;

    write_stack_update(view, item)
}

/// The caller's active stack
#[hdk_extern]
pub fn get_my_stack(_: ()) -> ExternResult<Vec<StackItemView>> {
    my_stack(false)
}

// ============================================================================
// Intake and Timeline Functions
// ============================================================================

/// Input for marking a stack item as taken
#[derive(Serialize, Deserialize, Debug)]
pub struct LogIntakeInput {
    pub stack_item_hash: ActionHash,
    /// Local calendar day, YYYY-MM-DD
    pub date: String,
}

fn intake_logs(agent: &AgentPubKey, date: &str) -> ExternResult<Vec<(Record, IntakeLog)>> {
    Ok(records_from_links(intake_anchor(agent, date)?, LinkTypes::DailyIntakeLogs)?
        .into_iter()
        .filter_map(|record| {
            let log = record.entry().to_app_option::<IntakeLog>().ok().flatten()?;
            Some((record, log))
        })
        .collect())
}

/// First log already written for this stack item, if any
fn existing_log<T>(logs: Vec<(T, IntakeLog)>, original_hash: &ActionHash) -> Option<T> {
    logs.into_iter()
        .find(|(_, log)| &log.stack_item_hash == original_hash)
        .map(|(found, _)| found)
}

/// Logs are keyed by the original hash, whichever version the caller passed
fn new_intake_log(view: &StackItemView, date: &str, taken_at: Timestamp) -> IntakeLog {
    IntakeLog {
        stack_item_hash: view.original_hash.clone(),
        supplement_id: view.item.supplement_id,
        date: date.to_string(),
        taken_at,
    }
}

/// Mark a stack item as taken for a day; repeated calls return the first log
#[hdk_extern]
pub fn log_intake(input: LogIntakeInput) -> ExternResult<Record> {
    let view = my_stack_item(&input.stack_item_hash)?;
    if !view.item.active {
        return Err(guest_error("Cannot log intake for a removed stack item"));
    }

    let me = view.item.owner.clone();
    if let Some(record) = existing_log(intake_logs(&me, &input.date)?, &view.original_hash) {
        return Ok(record);
    }

    let log = new_intake_log(&view, &input.date, sys_time()?);

    let action_hash = create_entry(&EntryTypes::IntakeLog(log))?;
    create_link(
        intake_anchor(&me, &input.date)?,
        action_hash.clone(),
        LinkTypes::DailyIntakeLogs,
        (),
    )?;

    get(action_hash, GetOptions::default())?
        .ok_or(guest_error("Failed to get created intake log"))
}

/// The caller's checklist for a day, grouped by schedule slot
#[hdk_extern]
pub fn get_daily_timeline(date: String) -> ExternResult<DailyTimeline> {
    if !is_valid_date(&date) {
        return Err(guest_error("Date must be formatted YYYY-MM-DD"));
    }

    let me = agent_info()?.agent_initial_pubkey;
    let taken: HashSet<String> = intake_logs(&me, &date)?
        .into_iter()
        .map(|(_, log)| log.stack_item_hash.to_string())
        .collect();

    let mut entries = Vec::new();
    for view in my_stack(false)? {
        let supplement = find_supplement(view.item.supplement_id)?.map(|(_, s)| s);
        entries.push(timeline_entry(&view, supplement.as_ref()));
    }

    Ok(build_timeline(entries, &taken))
}

/// Item unit wins over the catalog unit
fn display_unit(item: &StackItem, supplement: Option<&Supplement>) -> Option<String> {
    item.unit
        .clone()
        .or_else(|| supplement.and_then(|s| s.unit.clone()))
}

fn timeline_entry(view: &StackItemView, supplement: Option<&Supplement>) -> TimelineEntry {
    TimelineEntry {
        key: view.original_hash.to_string(),
        supplement_id: view.item.supplement_id,
        supplement_name: supplement
            .map(|s| s.name.clone())
            .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        schedule: view.item.schedule,
        dosage: view
            .item
            .custom_dosage
            .or_else(|| supplement.and_then(|s| s.base_dosage)),
        unit: display_unit(&view.item, supplement),
        taken: false,
    }
}

// ============================================================================
// Safety Check
// ============================================================================

/// Input for a stack safety check
#[derive(Serialize, Deserialize, Debug, Default)]
pub struct CheckStackSafetyInput {
    /// Overrides the default severity thresholds
    pub policy: Option<SafetyPolicy>,
}

/// Dosage rows for the caller's active stack, joined with the catalog
fn stack_snapshot() -> ExternResult<Vec<DosageCheckItem>> {
    let mut items = Vec::new();
    for view in my_stack(false)? {
        let supplement = match find_supplement(view.item.supplement_id) {
            Ok(found) => found.map(|(_, s)| s),
            Err(e) => {
                warn!(supplement = %view.item.supplement_id, error = ?e, "catalog lookup failed, checking without limits");
                None
            }
        };

        items.push(dosage_row(&view.item, supplement.as_ref()));
    }
    Ok(items)
}

/// Stack item joined with its catalog limits
fn dosage_row(item: &StackItem, supplement: Option<&Supplement>) -> DosageCheckItem {
    DosageCheckItem {
        supplement_id: item.supplement_id,
        custom_dosage: item.custom_dosage,
        base_dosage: supplement.and_then(|s| s.base_dosage),
        unit: display_unit(item, supplement),
        max_safe_dosage: supplement.and_then(|s| s.max_dosage),
    }
}

fn resolve_policy(requested: Option<SafetyPolicy>) -> SafetyPolicy {
    match requested {
        Some(policy) => match policy.validate() {
            Ok(()) => policy,
            Err(e) => {
                warn!(error = %e, "ignoring invalid safety policy");
                SafetyPolicy::default()
            }
        },
        None => SafetyPolicy::default(),
    }
}

/// Run the engine over a stack snapshot; an unreadable stack reports nothing
fn run_safety_check<S: SafetyStore>(
    store: S,
    snapshot: ExternResult<Vec<DosageCheckItem>>,
    policy: Option<SafetyPolicy>,
) -> SafetyReport {
    let items = match snapshot {
        Ok(items) => items,
        Err(e) => {
            warn!(error = ?e, "could not read stack, reporting no warnings");
            return SafetyReport::default();
        }
    };

    let engine = SafetyEngine::with_policy(store, resolve_policy(policy));
    pollster::block_on(engine.check_stack(&items))
}

/// Check the caller's active stack for interactions and dosage excesses
#[hdk_extern]
pub fn check_stack_safety(input: CheckStackSafetyInput) -> ExternResult<SafetyReport> {
    Ok(run_safety_check(DhtSafetyStore, stack_snapshot(), input.policy))
}

/// Convert host errors for the safety engine
pub(crate) fn lookup_error(e: WasmError) -> LookupError {
    LookupError::Backend(format!("{:?}", e))
}
