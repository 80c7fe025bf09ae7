// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Tom F.

//! Graphviz rendering of compiled automata.

use std::io;
use std::io::Write;

use crate::pattern::automaton::Automaton;

impl Automaton {
    /// Writes the automaton as a Graphviz `digraph`.
    ///
    /// Nodes are labelled `id:group`; final states are drawn as double
    /// circles. Edges are labelled with the symbol key and target pattern.
    pub fn write_dot(&self, w: &mut impl Write) -> io::Result<()> {
        writeln!(w, "digraph {{")?;

        for (src, state) in self.states().iter().enumerate() {
            let attrs = if state.is_final() {
                ", shape=doublecircle"
            } else {
                ""
            };
            let group = escape(&state.group().to_string());
            writeln!(w, "node[label=\"{src}:{group}\"{attrs}] id{src}")?;

            for (key, edges) in state.transitions() {
                for edge in edges {
                    let target = escape(edge.target().source());
                    for dst in edge.destinations() {
                        writeln!(w, "id{src} -> id{dst} [label=\"{key}/{target}/\"]")?;
                    }
                }
            }
        }

        writeln!(w, "}}")?;

        Ok(())
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
