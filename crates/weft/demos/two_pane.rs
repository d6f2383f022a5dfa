//! Two panes split by a vertical rule: static markup on the left, an
//! editable buffer on the right. Tab moves focus, Ctrl-C quits.

use weft::*;

fn main() -> Result<()> {
    let sheet = StyleSheet::new([
        ("title", "bold #ffaa00"),
        ("rule", "#444444"),
    ]);

    let mut layout = Layout::new();
    let left = layout.window(Control::text(Text::markup(
        "<title>weft demo</title>\n\nThe pane on the right is editable.\n\
         <b>Tab</b> cycles focus, <b>Ctrl-C</b> quits.",
    )));
    let rule = layout.filler('│', 1);
    let right = layout.window(Control::buffer(Buffer::with_text("type here")));
    let root = layout.vsplit(vec![left, rule, right]);
    layout.set_root(root);

    let mut console: Console<()> = Console::new(layout, sheet);
    console.install_default_bindings()?;
    console.install_editing_bindings()?;
    console.run()?;
    Ok(())
}
