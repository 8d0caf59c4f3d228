pub mod filebeat;
pub mod harvester;
pub mod process;
pub mod util;
