//! A scrolling multi-line editor with a status bar. Ctrl-D quits and prints
//! the buffer contents.

use weft::*;

fn main() -> Result<()> {
    // Logs corrupt the display unless redirected, so they are opt-in:
    // WEFT_LOG=debug cargo run --example editor 2>editor.log
    if std::env::var_os("WEFT_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .init();
    }

    let mut buffer = Buffer::with_text("Hello from weft.\n\nEdit me, then press Ctrl-D.\n");
    buffer.multiline = true;

    let mut layout = Layout::new();
    let edit = layout.window(Control::buffer(buffer));
    let view = layout.scrollable(edit);
    let status = layout.window(Control::text(Text::markup(
        "<status> Ctrl-D: finish   Ctrl-Z: undo </status>",
    )));
    let root = layout.hsplit(vec![view, status]);
    layout.set_root(root);
    if let Some(w) = layout.window_mut(status) {
        w.height = Some(Dimension::exact(1));
    }

    let sheet = StyleSheet::new([("status", "reverse")]);
    let mut console: Console<String> = Console::new(layout, sheet);
    console.install_editing_bindings()?;
    console.bind([Key::ctrl('d')], move |ev| {
        let text = ev
            .console
            .layout
            .buffer(edit)
            .map(|b| b.text().to_string());
        ev.console.exit(text);
        Ok(())
    })?;

    if let Some(text) = console.run()? {
        println!("{text}");
    }
    Ok(())
}
