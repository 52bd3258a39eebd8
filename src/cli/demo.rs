//! Built-in demo corpus: three sections of a car owner's manual.

/// Ids of the demo passages, parallel to [`CAR_MANUAL`].
pub const CAR_MANUAL_IDS: [&str; 3] = ["climate-control", "touchscreen", "shifting-gears"];

pub const CAR_MANUAL: [&str; 3] = [
    "Operating the Climate Control System. Your Googlecar has a climate control system that \
allows you to adjust the temperature and airflow in the car. To operate the climate control \
system, use the buttons and knobs located on the center console. Temperature: The temperature \
knob controls the temperature inside the car. Turn the knob clockwise to increase the temperature \
or counterclockwise to decrease the temperature. Airflow: The airflow knob controls the amount of \
airflow inside the car. Turn the knob clockwise to increase the airflow or counterclockwise to \
decrease the airflow. Fan speed: The fan speed knob controls the speed of the fan. Turn the knob \
clockwise to increase the fan speed or counterclockwise to decrease the fan speed. Mode: The mode \
button allows you to select the desired mode. The available modes are: Auto: The car will \
automatically adjust the temperature and airflow to maintain a comfortable level. Cool: The car \
will blow cool air into the car. Heat: The car will blow warm air into the car. Defrost: The car \
will blow warm air onto the windshield to defrost it.",
    "Touchscreen. Your Googlecar has a large touchscreen display that provides access to a \
variety of features, including navigation, entertainment, and climate control. To use the \
touchscreen display, simply touch the desired icon. For example, you can touch the \"Navigation\" \
icon to get directions to your destination or touch the \"Music\" icon to play your favorite songs.",
    "Shifting Gears. Your Googlecar has an automatic transmission. To shift gears, simply move \
the shift lever to the desired position. Park: This position is used when you are parking the \
car. The wheels are locked and the car cannot move. Reverse: This position is used to back up. \
Neutral: This position is used when you are stopped at a light or in traffic. The car is in \
neutral and will not move unless you press the gas pedal. Drive: This position is used to drive \
forward. Low: This position is used for driving in snow or other slippery conditions.",
];

/// Demo passages and their ids as owned strings.
pub fn car_manual() -> (Vec<String>, Vec<String>) {
    (
        CAR_MANUAL.iter().map(|s| s.to_string()).collect(),
        CAR_MANUAL_IDS.iter().map(|s| s.to_string()).collect(),
    )
}
