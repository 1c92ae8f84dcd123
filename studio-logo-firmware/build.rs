fn main() {
    embuild::espidf::sysenv::output();

    // Wi-Fi credentials and the broker URL are baked in at build time
    println!("cargo:rerun-if-env-changed=WIFI_SSID");
    println!("cargo:rerun-if-env-changed=WIFI_PASSWORD");
    println!("cargo:rerun-if-env-changed=MQTT_URL");
}
