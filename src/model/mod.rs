pub mod attendance_record;
pub mod geofence;
pub mod role;
pub mod user;
