// ============================================================================
// SERVICES - Red y bridge de plataforma (sin lógica de UI)
// ============================================================================

pub mod api_client;
pub mod attendance_service;
pub mod bridge;
pub mod camera;
pub mod identity_service;
pub mod location_service;
