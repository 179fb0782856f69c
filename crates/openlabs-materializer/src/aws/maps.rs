//! `(os -> AMI)` and `(spec -> instance type)` lookup tables.

pub fn ami_for_os(os: &str) -> &'static str {
    match os {
        "debian_11" => "ami-0b5c74e80c7d7a25e",
        "debian_12" => "ami-0e83be366243f524a",
        "ubuntu_20" => "ami-0c7217cdde317cfec",
        "ubuntu_22" => "ami-0fc5d935ebf8bc3bc",
        "kali" => "ami-0d7daba1bf2ab7a0c",
        "windows_server_2019" => "ami-0c2b8ca1dad447f8a",
        "windows_server_2022" => "ami-0aa7d40eeae50c9a9",
        // Unknown OS values fall back to the Ubuntu 22.04 AMI rather
        // than failing materialization outright.
        _ => "ami-0fc5d935ebf8bc3bc",
    }
}

pub fn instance_type_for_spec(spec: &str) -> &'static str {
    match spec {
        "tiny" => "t2.micro",
        "small" => "t2.small",
        "medium" => "t2.medium",
        "large" => "t2.large",
        _ => "t2.micro",
    }
}

/// The fixed jumpbox instance type.
pub const JUMPBOX_INSTANCE_TYPE: &str = "t2.micro";
pub const JUMPBOX_AMI: &str = "ami-0c7217cdde317cfec";
