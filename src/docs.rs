// src/docs.rs

use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(title = "Javna naročila API", description = "Čarovnik za pripravo dokumentacije javnih naročil"),
    paths(
        // --- Schema ---
        handlers::schema::get_schema,
        handlers::schema::list_steps,

        // --- Form ---
        handlers::form::apply_step,
        handlers::form::add_lot,
        handlers::form::rename_lot,
        handlers::form::remove_lot,
        handlers::form::copy_general_to_lot,
        handlers::form::validate_form,
        handlers::form::build_document,
        handlers::form::load_fields,

        // --- Drafts ---
        handlers::drafts::list_drafts,
        handlers::drafts::save_draft,
        handlers::drafts::get_draft,
        handlers::drafts::update_draft,
        handlers::drafts::delete_draft,

        // --- Procurements ---
        handlers::procurements::list_procurements,
        handlers::procurements::create_procurement,
        handlers::procurements::get_procurement,
        handlers::procurements::update_procurement,
        handlers::procurements::delete_procurement,

        // --- Export ---
        handlers::documents::export_procurement,
        handlers::documents::export_fields,
    ),
    components(
        schemas(
            // --- Schema ---
            models::schema::StepSummary,
            models::schema::FieldOption,
            models::session::SessionFieldMap,
            models::widget::Widget,
            models::widget::WidgetKind,

            // --- Records ---
            models::procurement::ProcurementStatus,
            models::procurement::ProcurementSummary,
            models::procurement::ProcurementRecord,
            models::procurement::ProcurementWithFields,
            models::procurement::Draft,
            models::procurement::DraftMetadata,
            models::procurement::DraftWithFields,
            models::procurement::OperationResult,
            models::document::ExportFormat,

            // --- Payloads ---
            models::procurement::FieldsPayload,
            models::procurement::SaveProcurementPayload,
            handlers::form::ApplyStepPayload,
            handlers::form::StepResponse,
            handlers::form::LotPayload,
            handlers::form::LotResponse,
            handlers::form::FieldsResponse,
            handlers::form::CopyGeneralResponse,
            handlers::form::ValidationReport,
            handlers::form::DocumentPayload,
            handlers::documents::ExportPayload,
        )
    ),
    tags(
        (name = "Schema", description = "Struktura obrazca in koraki čarovnika"),
        (name = "Form", description = "Izris korakov, sklopi, preverjanje in pretvorba podatkov"),
        (name = "Drafts", description = "Osnutki obrazcev"),
        (name = "Procurements", description = "Shranjena javna naročila"),
        (name = "Export", description = "Izvoz v Word in PDF")
    )
)]
pub struct ApiDoc;
