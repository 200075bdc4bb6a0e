mod connect;
mod discovery;
mod handler;

pub(super) use discovery::discover_ws_via_host_port;
pub(super) use handler::should_stop_handler;

#[cfg(test)]
pub(super) use discovery::JsonVersion;
#[cfg(test)]
pub(super) use handler::should_restart_handler;
