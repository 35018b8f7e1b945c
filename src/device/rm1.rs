use super::DeviceProfile;

/// reMarkable 1 (i.MX6 SoloLite, armv7).
pub const RM1: DeviceProfile = DeviceProfile {
    name: "reMarkable 1",
    key: "rm1",
    model_marker: "reMarkable 1",

    input_event_size: 16,

    pen_x_max: 20967,
    pen_y_max: 15725,
    pen_pressure_max: 4095,

    touch_x_max: 767,
    touch_y_max: 1023,

    display_width: 1404,
    display_height: 1872,

    pen_device: "/dev/input/event0",
    touch_device: "/dev/input/event1",
};
