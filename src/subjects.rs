// Canonical subject catalog for the coordination service.
// This file is the source of truth for subject strings.

// -----------------------------------------------------------------------------
// EVENTS
// -----------------------------------------------------------------------------

pub const EVT_ORDER_PLACED: &str = "prepline.evt.order.placed.v1";

// -----------------------------------------------------------------------------
// COMMANDS (operational control surface, health-feedback mechanism only)
// -----------------------------------------------------------------------------

pub const CMD_CAPACITY_THROTTLE: &str = "prepline.cmd.capacity.throttle.v1";
pub const CMD_CAPACITY_RESTRICT: &str = "prepline.cmd.capacity.restrict.v1";

// -----------------------------------------------------------------------------
// SUBSCRIPTION PATTERNS (WILDCARDS)
// -----------------------------------------------------------------------------

pub const CMD_CAPACITY_WILDCARD: &str = "prepline.cmd.capacity.>";
