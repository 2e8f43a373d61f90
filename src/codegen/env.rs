/// Per target constants of the emitted module.
pub trait Env {
    const TRIPLE: &str;
    const DATA_LAYOUT: &str;
}

impl Env for Darwin {
    const TRIPLE: &str = "x86_64-apple-darwin";
    const DATA_LAYOUT: &str =
        "e-m:o-p270:32:32-p271:32:32-p272:64:64-i64:64-i128:128-f80:128-n8:16:32:64-S128";
}

impl Env for Linux {
    const TRIPLE: &str = "x86_64-unknown-linux-gnu";
    const DATA_LAYOUT: &str =
        "e-m:e-p270:32:32-p271:32:32-p272:64:64-i64:64-i128:128-f80:128-n8:16:32:64-S128";
}

pub struct Darwin;

pub struct Linux;
