use super::DeviceProfile;

pub const RM2: DeviceProfile = DeviceProfile {
    name: "reMarkable 2",
    key: "rm2",
    model_marker: "reMarkable 2",

    input_event_size: 16,

    // Pen digitizer ranges (from device dumps)
    pen_x_max: 20967,
    pen_y_max: 15725,
    pen_pressure_max: 4095,

    // Touch reports in display pixels
    touch_x_max: 1403,
    touch_y_max: 1871,

    display_width: 1404,
    display_height: 1872,

    pen_device: "/dev/input/event1",
    touch_device: "/dev/input/event2",
};
