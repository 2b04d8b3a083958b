use std::fmt;

/// The extraction surface against the hosted page: a fixed, named set of
/// requests instead of ad hoc script strings. Each variant renders a
/// self-contained script that evaluates its DOM expression and delivers the
/// result back through the `page_response` command, tagged with the request
/// id. Absent elements degrade to `false` / empty strings inside the script
/// so a query never fails the cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageQuery {
    /// Does the play control carry the `playing` state class?
    IsPlaying,
    /// The five raw playback fields of one cycle's snapshot.
    TrackSnapshot,
}

impl PageQuery {
    pub fn script(&self, request_id: u64) -> String {
        format!(
            r#"(function () {{
  var deliver = function (value) {{
    if (window.__TAURI__ && window.__TAURI__.core) {{
      window.__TAURI__.core.invoke('page_response', {{ id: {request_id}, value: value }});
    }}
  }};
  try {{
    {body}
  }} catch (e) {{
    deliver(null);
  }}
}})();"#,
            request_id = request_id,
            body = self.body(),
        )
    }

    fn body(&self) -> &'static str {
        match self {
            PageQuery::IsPlaying => {
                r#"var control = document.querySelector('.playControls__play');
    deliver(!!(control && control.classList.contains('playing')));"#
            }
            PageQuery::TrackSnapshot => {
                r#"var text = function (selector) {
      var el = document.querySelector(selector);
      return el && el.innerText ? el.innerText : '';
    };
    var control = document.querySelector('.playControls__play');
    var artwork = document.querySelector('.playbackSoundBadge__avatar .image__lightOutline span');
    deliver({
      isPlaying: !!(control && control.classList.contains('playing')),
      title: text('.playbackSoundBadge__titleLink'),
      author: text('.playbackSoundBadge__lightLink'),
      artworkUrl: artwork ? artwork.style.backgroundImage : '',
      elapsedLabel: text('.playbackTimeline__timePassed span:last-child'),
      totalLabel: text('.playbackTimeline__duration span:last-child')
    });"#
            }
        }
    }
}

impl fmt::Display for PageQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageQuery::IsPlaying => write!(f, "is-playing"),
            PageQuery::TrackSnapshot => write!(f, "track-snapshot"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_playing_script_embeds_id_and_selector() {
        let script = PageQuery::IsPlaying.script(42);
        assert!(script.contains("id: 42"));
        assert!(script.contains(".playControls__play"));
        assert!(script.contains("classList.contains('playing')"));
    }

    #[test]
    fn snapshot_script_covers_all_fields() {
        let script = PageQuery::TrackSnapshot.script(7);
        for selector in [
            ".playbackSoundBadge__titleLink",
            ".playbackSoundBadge__lightLink",
            ".playbackSoundBadge__avatar .image__lightOutline span",
            ".playbackTimeline__timePassed span:last-child",
            ".playbackTimeline__duration span:last-child",
        ] {
            assert!(script.contains(selector), "missing {selector}");
        }
        for field in ["isPlaying", "title", "author", "artworkUrl", "elapsedLabel", "totalLabel"] {
            assert!(script.contains(field), "missing {field}");
        }
    }
}
