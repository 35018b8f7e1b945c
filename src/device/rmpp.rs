use super::DeviceProfile;

/// reMarkable Paper Pro.
///
/// - Display: 1620x2160 pixels (11.8", 229 dpi)
/// - Architecture: aarch64
pub const RMPP: DeviceProfile = DeviceProfile {
    name: "reMarkable Paper Pro",
    key: "rmpp",
    model_marker: "reMarkable Ferrari",

    // 64-bit ARM input_event struct size
    input_event_size: 24,

    pen_x_max: 11180,
    pen_y_max: 15340,
    pen_pressure_max: 4096,

    touch_x_max: 2064,
    touch_y_max: 2832,

    display_width: 1620,
    display_height: 2160,

    pen_device: "/dev/input/event2",
    touch_device: "/dev/input/event3",
};
