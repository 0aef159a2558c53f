// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};

use crate::handlers;
use crate::models;
use crate::realtime;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Automations ---
        handlers::automations::list_automations,
        handlers::automations::list_templates,
        handlers::automations::create_automation,
        handlers::automations::update_automation,
        handlers::automations::toggle_automation,
        handlers::automations::delete_automation,

        // --- Events ---
        handlers::events::publish_event,

        // --- Jobs ---
        handlers::jobs::list_jobs,
        handlers::jobs::job_stats,
        handlers::jobs::cancel_job,

        // --- Constraints ---
        handlers::constraints::get_quiet_hours,
        handlers::constraints::put_quiet_hours,
        handlers::constraints::get_rate_limits,
        handlers::constraints::put_rate_limit,
        handlers::constraints::get_opt_outs,
        handlers::constraints::create_opt_out,

        // --- Notifications ---
        handlers::notifications::list_notifications,
        handlers::notifications::unread_count,
        handlers::notifications::create_notification,
        handlers::notifications::mark_read,
        handlers::notifications::mark_all_read,
        handlers::notifications::notifications_ws,

        // --- Searches ---
        handlers::searches::list_recent_searches,
        handlers::searches::push_recent_search,
    ),
    components(
        schemas(
            // --- Automations ---
            models::automation::TriggerEvent,
            models::automation::Channel,
            models::automation::CommunicationAutomation,
            handlers::automations::CreateAutomationPayload,
            handlers::automations::UpdateAutomationPayload,
            handlers::automations::ToggleAutomationPayload,

            // --- Events ---
            handlers::events::PublishEventPayload,

            // --- Jobs ---
            models::job::EntityKind,
            models::job::JobStatus,
            models::job::EntityRef,
            models::job::AutomationJob,
            models::job::JobStats,

            // --- Constraints ---
            models::constraint::QuietHoursConfig,
            models::constraint::RateLimitConfig,
            models::constraint::CommunicationOptOut,
            handlers::constraints::UpsertQuietHoursPayload,
            handlers::constraints::UpsertRateLimitPayload,
            handlers::constraints::CreateOptOutPayload,

            // --- Notifications ---
            models::notification::Notification,
            models::notification::UnreadCount,
            handlers::notifications::CreateNotificationPayload,
            realtime::ChangeOp,
            realtime::RealtimeEvent,

            // --- Searches ---
            handlers::searches::PushSearchPayload,
        )
    ),
    tags(
        (name = "Automations", description = "Regras de comunicação automática"),
        (name = "Events", description = "Eventos de negócio que disparam o fanout"),
        (name = "Jobs", description = "Fila de entregas agendadas"),
        (name = "Constraints", description = "Quiet hours, rate limits e opt-outs"),
        (name = "Notifications", description = "Notificações in-app e realtime"),
        (name = "Searches", description = "Buscas recentes do usuário")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
