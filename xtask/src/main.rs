/// The xtask binary delegates entirely to nih_plug_xtask, which provides
/// the `bundle` subcommand. Usage:
///
///   cargo xtask bundle loveless-reverb-v1 --release
///
/// This compiles the plugin as a cdylib and packages it into
/// `target/bundled/Loveless Reverb.vst3` and `Loveless Reverb.clap`.
fn main() -> nih_plug_xtask::Result<()> {
    nih_plug_xtask::main()
}
